use serde::Serialize;
use thiserror::Error;

use super::model::Product;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("title is required")]
    MissingTitle,

    #[error("invalid price '{value}', expected a non-negative number")]
    InvalidPrice { value: String },

    #[error("invalid category id '{value}', expected an integer")]
    InvalidCategoryId { value: String },

    #[error("image URL is required")]
    MissingImage,

    #[error("unknown field '{field}'")]
    UnknownField { field: String },
}

/// Raw, unvalidated input for a new product.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CreateForm {
    pub title: String,
    pub price: String,
    pub category_id: String,
    pub description: String,
    pub image: String,
}

/// Raw, unvalidated input for an edit. Starts out as a copy of the record.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpdateForm {
    pub title: String,
    pub price: String,
    pub description: String,
    pub image: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFields {
    pub title: String,
    pub price: f64,
    pub description: String,
    pub category_id: i64,
    pub images: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UpdateFields {
    pub title: String,
    pub price: f64,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

fn parse_price(raw: &str) -> Result<f64, ValidationError> {
    let trimmed = raw.trim();
    match trimmed.parse::<f64>() {
        Ok(price) if price.is_finite() && price >= 0.0 => Ok(price),
        _ => Err(ValidationError::InvalidPrice {
            value: trimmed.to_string(),
        }),
    }
}

fn required_title(raw: &str) -> Result<String, ValidationError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(ValidationError::MissingTitle);
    }
    Ok(title.to_string())
}

impl CreateForm {
    pub fn set(&mut self, field: &str, value: &str) -> Result<(), ValidationError> {
        let slot = match field.to_ascii_lowercase().as_str() {
            "title" => &mut self.title,
            "price" => &mut self.price,
            "category" | "category_id" | "categoryid" => &mut self.category_id,
            "description" | "desc" => &mut self.description,
            "image" | "img" => &mut self.image,
            _ => {
                return Err(ValidationError::UnknownField {
                    field: field.to_string(),
                })
            }
        };
        *slot = value.to_string();
        Ok(())
    }

    pub fn validate(&self) -> Result<CreateFields, ValidationError> {
        let title = required_title(&self.title)?;
        let price = parse_price(&self.price)?;
        let category_raw = self.category_id.trim();
        let category_id =
            category_raw
                .parse::<i64>()
                .map_err(|_| ValidationError::InvalidCategoryId {
                    value: category_raw.to_string(),
                })?;
        let image = self.image.trim();
        if image.is_empty() {
            return Err(ValidationError::MissingImage);
        }
        Ok(CreateFields {
            title,
            price,
            description: self.description.trim().to_string(),
            category_id,
            images: vec![image.to_string()],
        })
    }
}

impl UpdateForm {
    pub fn from_product(product: &Product) -> Self {
        Self {
            title: product.title.clone(),
            price: product.price.to_string(),
            description: product.description.clone().unwrap_or_default(),
            image: product.primary_image(),
        }
    }

    pub fn set(&mut self, field: &str, value: &str) -> Result<(), ValidationError> {
        let slot = match field.to_ascii_lowercase().as_str() {
            "title" => &mut self.title,
            "price" => &mut self.price,
            "description" | "desc" => &mut self.description,
            "image" | "img" => &mut self.image,
            _ => {
                return Err(ValidationError::UnknownField {
                    field: field.to_string(),
                })
            }
        };
        *slot = value.to_string();
        Ok(())
    }

    pub fn validate(&self) -> Result<UpdateFields, ValidationError> {
        let title = required_title(&self.title)?;
        let price = parse_price(&self.price)?;
        let image = self.image.trim();
        let images = if image.is_empty() {
            Vec::new()
        } else {
            vec![image.to_string()]
        };
        Ok(UpdateFields {
            title,
            price,
            description: self.description.trim().to_string(),
            images,
        })
    }
}
