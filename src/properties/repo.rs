use axum::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::AppResult;
use crate::listing::{Page, SortBy};
use crate::properties::repo_types::{Property, PropertyRow};

#[async_trait]
pub trait PropertyRepository: Send + Sync {
    async fn insert(&self, property: &Property) -> AppResult<Property>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Property>>;
    /// Bumps the view counter and returns the updated listing.
    async fn record_view(&self, id: Uuid) -> AppResult<Option<Property>>;
    /// One page plus the total number of listings.
    async fn list(&self, page: Page, sort: SortBy) -> AppResult<(Vec<Property>, u64)>;
    async fn list_by_owner(&self, user_id: Uuid) -> AppResult<Vec<Property>>;
    /// Writes every mutable column; views are left to `record_view`.
    async fn update(&self, property: &Property) -> AppResult<Property>;
    /// `false` when nothing was deleted.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
}

const PROPERTY_COLUMNS: &str = "id, user_id, first_name, last_name, contact, alt_contact, \
     locality, address, latitude, longitude, space_type, pets_allowed, preference, bachelors, \
     furnishing_type, bhk, floor, landmark, washroom_type, cooling, parking, rent, maintenance, \
     area, appliances, amenities, about, photos, views, created_at";

fn order_clause(sort: SortBy) -> &'static str {
    match sort {
        SortBy::Latest => "created_at DESC, id",
        SortBy::Trending => "views DESC, created_at DESC, id",
    }
}

fn into_properties(rows: Vec<PropertyRow>) -> AppResult<Vec<Property>> {
    Ok(rows
        .into_iter()
        .map(Property::try_from)
        .collect::<anyhow::Result<Vec<_>>>()?)
}

pub struct PgPropertyRepository {
    db: PgPool,
}

impl PgPropertyRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PropertyRepository for PgPropertyRepository {
    async fn insert(&self, p: &Property) -> AppResult<Property> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("INSERT INTO properties ({PROPERTY_COLUMNS}) VALUES ("));
        {
            let mut values = qb.separated(", ");
            values
                .push_bind(p.id)
                .push_bind(p.user_id)
                .push_bind(&p.first_name)
                .push_bind(&p.last_name)
                .push_bind(&p.contact)
                .push_bind(&p.alt_contact)
                .push_bind(&p.locality)
                .push_bind(&p.address)
                .push_bind(p.latitude)
                .push_bind(p.longitude)
                .push_bind(p.space_type.as_str())
                .push_bind(&p.pets_allowed)
                .push_bind(&p.preference)
                .push_bind(&p.bachelors)
                .push_bind(&p.furnishing_type)
                .push_bind(&p.bhk)
                .push_bind(&p.floor)
                .push_bind(&p.landmark)
                .push_bind(&p.washroom_type)
                .push_bind(&p.cooling)
                .push_bind(&p.parking)
                .push_bind(p.rent)
                .push_bind(p.maintenance)
                .push_bind(p.area)
                .push_bind(&p.appliances)
                .push_bind(&p.amenities)
                .push_bind(&p.about)
                .push_bind(&p.photos)
                .push_bind(p.views)
                .push_bind(p.created_at);
        }
        qb.push(format!(") RETURNING {PROPERTY_COLUMNS}"));

        let row = qb
            .build_query_as::<PropertyRow>()
            .fetch_one(&self.db)
            .await?;
        Ok(Property::try_from(row)?)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Property>> {
        let row = sqlx::query_as::<_, PropertyRow>(&format!(
            "SELECT {PROPERTY_COLUMNS} FROM properties WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Property::try_from).transpose()?)
    }

    async fn record_view(&self, id: Uuid) -> AppResult<Option<Property>> {
        let row = sqlx::query_as::<_, PropertyRow>(&format!(
            "UPDATE properties SET views = views + 1 WHERE id = $1 RETURNING {PROPERTY_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Property::try_from).transpose()?)
    }

    async fn list(&self, page: Page, sort: SortBy) -> AppResult<(Vec<Property>, u64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM properties")
            .fetch_one(&self.db)
            .await?;

        let rows = sqlx::query_as::<_, PropertyRow>(&format!(
            r#"
            SELECT {PROPERTY_COLUMNS}
            FROM properties
            ORDER BY {}
            LIMIT $1 OFFSET $2
            "#,
            order_clause(sort)
        ))
        .bind(page.limit as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.db)
        .await?;

        Ok((into_properties(rows)?, total.max(0) as u64))
    }

    async fn list_by_owner(&self, user_id: Uuid) -> AppResult<Vec<Property>> {
        let rows = sqlx::query_as::<_, PropertyRow>(&format!(
            r#"
            SELECT {PROPERTY_COLUMNS}
            FROM properties
            WHERE user_id = $1
            ORDER BY created_at DESC, id
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        into_properties(rows)
    }

    async fn update(&self, p: &Property) -> AppResult<Property> {
        let row = sqlx::query_as::<_, PropertyRow>(&format!(
            r#"
            UPDATE properties
               SET first_name = $2, last_name = $3, contact = $4, alt_contact = $5,
                   locality = $6, address = $7, latitude = $8, longitude = $9,
                   space_type = $10, pets_allowed = $11, preference = $12, bachelors = $13,
                   furnishing_type = $14, bhk = $15, floor = $16, landmark = $17,
                   washroom_type = $18, cooling = $19, parking = $20, rent = $21,
                   maintenance = $22, area = $23, appliances = $24, amenities = $25,
                   about = $26, photos = $27
             WHERE id = $1
            RETURNING {PROPERTY_COLUMNS}
            "#
        ))
        .bind(p.id)
        .bind(&p.first_name)
        .bind(&p.last_name)
        .bind(&p.contact)
        .bind(&p.alt_contact)
        .bind(&p.locality)
        .bind(&p.address)
        .bind(p.latitude)
        .bind(p.longitude)
        .bind(p.space_type.as_str())
        .bind(&p.pets_allowed)
        .bind(&p.preference)
        .bind(&p.bachelors)
        .bind(&p.furnishing_type)
        .bind(&p.bhk)
        .bind(&p.floor)
        .bind(&p.landmark)
        .bind(&p.washroom_type)
        .bind(&p.cooling)
        .bind(&p.parking)
        .bind(p.rent)
        .bind(p.maintenance)
        .bind(p.area)
        .bind(&p.appliances)
        .bind(&p.amenities)
        .bind(&p.about)
        .bind(&p.photos)
        .fetch_one(&self.db)
        .await?;
        Ok(Property::try_from(row)?)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let res = sqlx::query("DELETE FROM properties WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
