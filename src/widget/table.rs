//! Tables with lazily read rows and per-column embedded widgets.

use std::collections::HashMap;
use std::sync::Arc;

use crate::browser::{ElementRef, Locator, Session};
use crate::error::{Error, Result};

use super::GenericWidget;

/// Rows relative to the table element.
pub const ROW_XPATH: &str = "./tbody/tr";

/// Cells relative to a row.
pub const CELL_XPATH: &str = "./td";

/// A data table.
#[derive(Clone)]
pub struct Table {
    widget: GenericWidget,
    column_widgets: Arc<HashMap<usize, Locator>>,
}

impl Table {
    /// Table found by `locator`.
    pub fn new(session: &Session, locator: Locator) -> Self {
        Self {
            widget: GenericWidget::new(session, locator),
            column_widgets: Arc::new(HashMap::new()),
        }
    }

    /// Declares the widget embedded in every cell of `column`.
    pub fn with_column_widget(mut self, column: usize, locator: Locator) -> Self {
        Arc::make_mut(&mut self.column_widgets).insert(column, locator);
        self
    }

    /// Whether the table is rendered.
    pub async fn is_displayed(&self) -> bool {
        self.widget.is_displayed().await
    }

    /// Waits until the table is rendered.
    pub async fn wait_displayed(&self) -> Result<()> {
        self.widget.wait_displayed().await
    }

    /// Current rows, top to bottom. Cells are read on demand.
    pub async fn rows(&self) -> Result<Vec<Row>> {
        let table = self.widget.require().await?;
        let session = self.widget.session();
        let rows = session
            .browser()
            .find_all(Some(&table), &Locator::xpath(ROW_XPATH))
            .await?;

        Ok(rows
            .into_iter()
            .map(|element| Row {
                session: session.clone(),
                element,
                column_widgets: Arc::clone(&self.column_widgets),
            })
            .collect())
    }

    /// First row whose `column` text equals `text`.
    pub async fn row_matching(&self, column: usize, text: &str) -> Result<Option<Row>> {
        for row in self.rows().await? {
            if row.cell_text(column).await?.trim() == text {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }

    /// First row whose `column` text equals `text`; no match is an error.
    pub async fn row_with_text(&self, column: usize, text: &str) -> Result<Row> {
        self.row_matching(column, text)
            .await?
            .ok_or_else(|| Error::RowNotFound {
                table: self.widget.locator().to_string(),
                column,
                key: text.to_string(),
            })
    }
}

/// One table row.
#[derive(Clone)]
pub struct Row {
    session: Session,
    element: ElementRef,
    column_widgets: Arc<HashMap<usize, Locator>>,
}

impl Row {
    /// Cell elements of this row.
    pub async fn cells(&self) -> Result<Vec<ElementRef>> {
        self.session
            .browser()
            .find_all(Some(&self.element), &Locator::xpath(CELL_XPATH))
            .await
    }

    /// Cell at `index`.
    pub async fn cell(&self, index: usize) -> Result<ElementRef> {
        self.cells()
            .await?
            .into_iter()
            .nth(index)
            .ok_or_else(|| Error::ElementNotFound(format!("cell {} of row {}", index, self.element.0)))
    }

    /// Text of the cell at `index`.
    pub async fn cell_text(&self, index: usize) -> Result<String> {
        let cell = self.cell(index).await?;
        self.session.browser().text(&cell).await
    }

    /// The widget declared for `column`, resolved inside that cell.
    pub async fn widget(&self, column: usize) -> Result<Option<GenericWidget>> {
        let Some(locator) = self.column_widgets.get(&column) else {
            return Ok(None);
        };
        let cell = self.cell(column).await?;
        Ok(Some(GenericWidget::scoped(
            &self.session,
            locator.clone(),
            cell,
        )))
    }

    /// The widget declared for `column`; undeclared is an error.
    pub async fn require_widget(&self, column: usize) -> Result<GenericWidget> {
        self.widget(column)
            .await?
            .ok_or_else(|| Error::ElementNotFound(format!("no widget declared for column {}", column)))
    }
}
