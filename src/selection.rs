use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::Dataset;
use crate::error::FetchError;
use crate::table::DatasetTable;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectColumn {
    #[default]
    Name,
    Id,
}

impl SelectColumn {
    pub fn column(self) -> &'static str {
        match self {
            SelectColumn::Name => "Name",
            SelectColumn::Id => "ID",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    Values {
        column: SelectColumn,
        values: Vec<String>,
    },
}

impl Selection {
    pub fn by_name<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Selection::Values {
            column: SelectColumn::Name,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn by_id<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Selection::Values {
            column: SelectColumn::Id,
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// Resolves a selection against `table`.
///
/// Each requested value picks the first row whose column equals it, in
/// request order; a value with no row is an error. An empty table selects
/// nothing.
pub fn select(
    table: &DatasetTable,
    selection: &Selection,
) -> Result<Vec<Arc<Dataset>>, FetchError> {
    if table.is_empty() {
        return Ok(Vec::new());
    }
    match selection {
        Selection::All => Ok(table.datasets().cloned().collect()),
        Selection::Values { column, values } => values
            .iter()
            .map(|value| {
                table
                    .records()
                    .iter()
                    .find(|record| match column {
                        SelectColumn::Name => record.name == *value,
                        SelectColumn::Id => record.id == *value,
                    })
                    .map(|record| Arc::clone(&record.dataset))
                    .ok_or_else(|| {
                        FetchError::DatasetNotFound(format!("{}={value}", column.column()))
                    })
            })
            .collect(),
    }
}
