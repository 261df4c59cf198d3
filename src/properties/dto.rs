use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Property, SpaceType};
use crate::{
    error::{ensure_valid, AppError, AppResult, FieldError},
    images::MultipartForm,
};

/// Listing fields parsed from a multipart form. Every field is optional here;
/// creation checks the required ones, updates apply whatever is present.
#[derive(Debug, Default)]
pub struct PropertyInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub contact: Option<String>,
    pub alt_contact: Option<String>,
    pub locality: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub space_type: Option<SpaceType>,
    pub pets_allowed: Option<String>,
    pub preference: Option<String>,
    pub bachelors: Option<String>,
    pub furnishing_type: Option<String>,
    pub bhk: Option<String>,
    pub floor: Option<String>,
    pub landmark: Option<String>,
    pub washroom_type: Option<String>,
    pub cooling: Option<String>,
    pub parking: Option<String>,
    pub rent: Option<f64>,
    pub maintenance: Option<f64>,
    pub area: Option<f64>,
    pub appliances: Option<Vec<String>>,
    pub amenities: Option<Vec<String>>,
    pub about: Option<String>,
}

#[derive(Clone, Copy)]
enum Bounds {
    NonNegative,
    Between(f64, f64),
}

fn number(
    form: &MultipartForm,
    field: &str,
    bounds: Bounds,
    errors: &mut Vec<FieldError>,
) -> Option<f64> {
    let raw = form.text(field)?;
    let Some(n) = raw.parse::<f64>().ok().filter(|n| n.is_finite()) else {
        errors.push(FieldError::new(field, format!("{field} must be a number")));
        return None;
    };
    let message = match bounds {
        Bounds::NonNegative if n < 0.0 => format!("{field} cannot be negative"),
        Bounds::Between(lo, hi) if n < lo || n > hi => {
            format!("{field} must be between {lo} and {hi}")
        }
        _ => return Some(n),
    };
    errors.push(FieldError::new(field, message));
    None
}

/// Repeated values or one comma-separated value; trimmed, blanks dropped.
/// `Some(vec![])` when the field was sent empty, `None` when absent.
fn string_list(form: &MultipartForm, field: &str) -> Option<Vec<String>> {
    let values = form.values(field)?;
    Some(
        values
            .iter()
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
            .collect(),
    )
}

impl PropertyInput {
    pub fn from_form(form: &MultipartForm) -> AppResult<Self> {
        let mut errors = Vec::new();
        let space_type = form.text("spaceType").and_then(|raw| {
            let parsed = SpaceType::parse(&raw);
            if parsed.is_none() {
                errors.push(FieldError::new(
                    "spaceType",
                    "spaceType must be one of Flat, House, PG, Warehouse, Office, Shop",
                ));
            }
            parsed
        });
        let input = Self {
            first_name: form.text("firstName"),
            last_name: form.text("lastName"),
            contact: form.text("contact"),
            alt_contact: form.text("altContact"),
            locality: form.text("locality"),
            address: form.text("address"),
            latitude: number(form, "latitude", Bounds::Between(-90.0, 90.0), &mut errors),
            longitude: number(form, "longitude", Bounds::Between(-180.0, 180.0), &mut errors),
            space_type,
            pets_allowed: form.text("petsAllowed"),
            preference: form.text("preference"),
            bachelors: form.text("bachelors"),
            furnishing_type: form.text("furnishingType"),
            bhk: form.text("bhk"),
            floor: form.text("floor"),
            landmark: form.text("landmark"),
            washroom_type: form.text("washroomType"),
            cooling: form.text("cooling"),
            parking: form.text("parking"),
            rent: number(form, "rent", Bounds::NonNegative, &mut errors),
            maintenance: number(form, "maintenance", Bounds::NonNegative, &mut errors),
            area: number(form, "area", Bounds::NonNegative, &mut errors),
            appliances: string_list(form, "appliances"),
            amenities: string_list(form, "amenities"),
            about: form.text("about"),
        };
        ensure_valid(errors)?;
        Ok(input)
    }

    pub fn into_property(
        self,
        owner: Uuid,
        photos: Vec<String>,
        now: OffsetDateTime,
    ) -> AppResult<Property> {
        let mut errors = Vec::new();
        fn required<T>(v: Option<T>, field: &str, errors: &mut Vec<FieldError>) -> Option<T> {
            if v.is_none() {
                errors.push(FieldError::new(field, format!("{field} is required")));
            }
            v
        }
        let first_name = required(self.first_name, "firstName", &mut errors);
        let last_name = required(self.last_name, "lastName", &mut errors);
        let contact = required(self.contact, "contact", &mut errors);
        let locality = required(self.locality, "locality", &mut errors);
        let address = required(self.address, "address", &mut errors);
        let latitude = required(self.latitude, "latitude", &mut errors);
        let longitude = required(self.longitude, "longitude", &mut errors);
        let space_type = required(self.space_type, "spaceType", &mut errors);
        let rent = required(self.rent, "rent", &mut errors);

        let (
            Some(first_name),
            Some(last_name),
            Some(contact),
            Some(locality),
            Some(address),
            Some(latitude),
            Some(longitude),
            Some(space_type),
            Some(rent),
        ) = (first_name, last_name, contact, locality, address, latitude, longitude, space_type, rent)
        else {
            return Err(AppError::Validation(errors));
        };

        Ok(Property {
            id: Uuid::new_v4(),
            user_id: owner,
            first_name,
            last_name,
            contact,
            alt_contact: self.alt_contact,
            locality,
            address,
            latitude,
            longitude,
            space_type,
            pets_allowed: self.pets_allowed.unwrap_or_else(|| "No".into()),
            preference: self.preference,
            bachelors: self.bachelors,
            furnishing_type: self.furnishing_type,
            bhk: self.bhk,
            floor: self.floor,
            landmark: self.landmark,
            washroom_type: self.washroom_type,
            cooling: self.cooling,
            parking: self.parking.unwrap_or_else(|| "No".into()),
            rent,
            maintenance: self.maintenance,
            area: self.area,
            appliances: self.appliances.unwrap_or_default(),
            amenities: self.amenities.unwrap_or_default(),
            about: self.about,
            photos,
            views: 0,
            created_at: now,
        })
    }

    /// Overwrites the fields that were sent.
    pub fn apply(self, p: &mut Property) {
        macro_rules! set {
            ($($field:ident),* $(,)?) => {
                $(if let Some(v) = self.$field { p.$field = v; })*
            };
        }
        macro_rules! set_opt {
            ($($field:ident),* $(,)?) => {
                $(if let Some(v) = self.$field { p.$field = Some(v); })*
            };
        }
        set!(
            first_name, last_name, contact, locality, address, latitude, longitude, space_type,
            pets_allowed, parking, rent, appliances, amenities,
        );
        set_opt!(
            alt_contact, preference, bachelors, furnishing_type, bhk, floor, landmark,
            washroom_type, cooling, maintenance, area, about,
        );
    }
}

/// Photos the client wants to keep; `None` when the field was not sent.
pub fn existing_photos(form: &MultipartForm) -> Option<Vec<String>> {
    let values = form.values("existingPhotos")?;
    Some(
        values
            .iter()
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(String::from)
            .collect(),
    )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyListResponse {
    pub properties: Vec<Property>,
    pub current_page: u32,
    pub total_pages: u64,
    pub total_properties: u64,
}
