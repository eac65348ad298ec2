//! Repository for catalog items.

use chrono::NaiveDate;
use curio_core::error::QueryError;
use curio_core::types::{Category, Collectible};
use uuid::Uuid;

use crate::executor::{QueryExecutor, QueryRequest, ResultRow};

const COLUMNS: &str = "id, name, category, price, released_on";

/// Reads and writes `collectibles` rows.
#[derive(Clone)]
pub struct CollectibleRepository {
    executor: QueryExecutor,
}

impl CollectibleRepository {
    pub fn new(executor: QueryExecutor) -> Self {
        Self { executor }
    }

    pub async fn find_all(&self) -> Result<Vec<Collectible>, QueryError> {
        let request =
            QueryRequest::new(format!("SELECT {COLUMNS} FROM collectibles ORDER BY name"));
        let rows = self.executor.fetch_all(&request).await?;
        rows.iter().map(decode_collectible).collect()
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Collectible>, QueryError> {
        let request = QueryRequest::new(format!("SELECT {COLUMNS} FROM collectibles WHERE id = ?"))
            .bind(id.to_string());
        match self.executor.fetch_optional(&request).await? {
            Some(row) => Ok(Some(decode_collectible(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn find_by_category(
        &self,
        category: Category,
    ) -> Result<Vec<Collectible>, QueryError> {
        let request = QueryRequest::new(format!(
            "SELECT {COLUMNS} FROM collectibles WHERE category = ? ORDER BY name"
        ))
        .bind(category.as_str());
        let rows = self.executor.fetch_all(&request).await?;
        rows.iter().map(decode_collectible).collect()
    }

    /// Items whose release date falls within the given calendar year.
    pub async fn released_in(&self, year: i32) -> Result<Vec<Collectible>, QueryError> {
        // released_on is ISO-8601 text, so the year is its first four chars.
        let request = QueryRequest::new(format!(
            "SELECT {COLUMNS} FROM collectibles \
             WHERE substr(released_on, 1, 4) = ? ORDER BY released_on"
        ))
        .bind(format!("{year:04}"));
        let rows = self.executor.fetch_all(&request).await?;
        rows.iter().map(decode_collectible).collect()
    }

    pub async fn insert(&self, item: &Collectible) -> Result<(), QueryError> {
        let request = QueryRequest::new(
            "INSERT INTO collectibles (id, name, category, price, released_on) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(item.id.to_string())
        .bind(item.name.as_str())
        .bind(item.category.as_str())
        .bind(item.price)
        .bind(item.released_on.to_string());
        self.executor.execute(&request).await?;
        Ok(())
    }

    /// Returns `false` when no row matched the item's id.
    pub async fn update(&self, item: &Collectible) -> Result<bool, QueryError> {
        let request = QueryRequest::new(
            "UPDATE collectibles SET name = ?, category = ?, price = ?, released_on = ? \
             WHERE id = ?",
        )
        .bind(item.name.as_str())
        .bind(item.category.as_str())
        .bind(item.price)
        .bind(item.released_on.to_string())
        .bind(item.id.to_string());
        let affected = self.executor.execute(&request).await?;
        Ok(affected > 0)
    }

    /// Returns `false` when no row matched the id.
    pub async fn delete(&self, id: Uuid) -> Result<bool, QueryError> {
        let request =
            QueryRequest::new("DELETE FROM collectibles WHERE id = ?").bind(id.to_string());
        let affected = self.executor.execute(&request).await?;
        Ok(affected > 0)
    }
}

fn decode_collectible(row: &ResultRow) -> Result<Collectible, QueryError> {
    let id = Uuid::parse_str(row.text("id")?)
        .map_err(|e| QueryError::Decode(format!("column 'id': {e}")))?;
    let category_text = row.text("category")?;
    let category = Category::parse(category_text).ok_or_else(|| {
        QueryError::Decode(format!("column 'category': unknown value '{category_text}'"))
    })?;
    let released_on: NaiveDate = row
        .text("released_on")?
        .parse()
        .map_err(|e| QueryError::Decode(format!("column 'released_on': {e}")))?;
    Ok(Collectible {
        id,
        name: row.text("name")?.to_string(),
        category,
        price: row.real("price")?,
        released_on,
    })
}
