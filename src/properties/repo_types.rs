use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::ownership::Owned;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SpaceType {
    Flat,
    House,
    #[serde(rename = "PG")]
    Pg,
    Warehouse,
    Office,
    Shop,
}

impl SpaceType {
    pub const ALL: [SpaceType; 6] = [
        SpaceType::Flat,
        SpaceType::House,
        SpaceType::Pg,
        SpaceType::Warehouse,
        SpaceType::Office,
        SpaceType::Shop,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SpaceType::Flat => "Flat",
            SpaceType::House => "House",
            SpaceType::Pg => "PG",
            SpaceType::Warehouse => "Warehouse",
            SpaceType::Office => "Office",
            SpaceType::Shop => "Shop",
        }
    }

    pub fn parse(raw: &str) -> Option<SpaceType> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(raw))
    }
}

/// A rental listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub contact: String,
    pub alt_contact: Option<String>,
    pub locality: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub space_type: SpaceType,
    pub pets_allowed: String,
    pub preference: Option<String>,
    pub bachelors: Option<String>,
    pub furnishing_type: Option<String>,
    pub bhk: Option<String>,
    pub floor: Option<String>,
    pub landmark: Option<String>,
    pub washroom_type: Option<String>,
    pub cooling: Option<String>,
    pub parking: String,
    pub rent: f64,
    pub maintenance: Option<f64>,
    pub area: Option<f64>,
    pub appliances: Vec<String>,
    pub amenities: Vec<String>,
    pub about: Option<String>,
    pub photos: Vec<String>,
    pub views: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Owned for Property {
    const KIND: &'static str = "property";

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> Uuid {
        self.user_id
    }
}

#[derive(Debug, FromRow)]
pub struct PropertyRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub contact: String,
    pub alt_contact: Option<String>,
    pub locality: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub space_type: String,
    pub pets_allowed: String,
    pub preference: Option<String>,
    pub bachelors: Option<String>,
    pub furnishing_type: Option<String>,
    pub bhk: Option<String>,
    pub floor: Option<String>,
    pub landmark: Option<String>,
    pub washroom_type: Option<String>,
    pub cooling: Option<String>,
    pub parking: String,
    pub rent: f64,
    pub maintenance: Option<f64>,
    pub area: Option<f64>,
    pub appliances: Vec<String>,
    pub amenities: Vec<String>,
    pub about: Option<String>,
    pub photos: Vec<String>,
    pub views: i64,
    pub created_at: OffsetDateTime,
}

impl TryFrom<PropertyRow> for Property {
    type Error = anyhow::Error;

    fn try_from(r: PropertyRow) -> Result<Self, Self::Error> {
        let space_type = SpaceType::parse(&r.space_type).ok_or_else(|| {
            anyhow::anyhow!("unknown space type {:?} on property {}", r.space_type, r.id)
        })?;
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            first_name: r.first_name,
            last_name: r.last_name,
            contact: r.contact,
            alt_contact: r.alt_contact,
            locality: r.locality,
            address: r.address,
            latitude: r.latitude,
            longitude: r.longitude,
            space_type,
            pets_allowed: r.pets_allowed,
            preference: r.preference,
            bachelors: r.bachelors,
            furnishing_type: r.furnishing_type,
            bhk: r.bhk,
            floor: r.floor,
            landmark: r.landmark,
            washroom_type: r.washroom_type,
            cooling: r.cooling,
            parking: r.parking,
            rent: r.rent,
            maintenance: r.maintenance,
            area: r.area,
            appliances: r.appliances,
            amenities: r.amenities,
            about: r.about,
            photos: r.photos,
            views: r.views,
            created_at: r.created_at,
        })
    }
}
