use axum::{
    Json,
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use validator::Validate;

use crate::error::AppError;

/// UploadedImage
///
/// The `image` part of a multipart body, held in memory until the storage service
/// persists it.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// FormPayload
///
/// Body extractor for entity writes. Accepts either a JSON object or a
/// `multipart/form-data` body whose text parts are the entity fields, plus an optional
/// `image` file part and an optional `folder` part naming the upload sub-directory.
/// The decoded fields are validated before the handler runs.
#[derive(Debug)]
pub struct FormPayload<T> {
    pub fields: T,
    pub image: Option<UploadedImage>,
    pub folder: Option<String>,
}

impl<S, T> FromRequest<S> for FormPayload<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|ct| ct.starts_with("multipart/form-data"))
            .unwrap_or(false);

        if !is_multipart {
            let Json(value) = Json::<Value>::from_request(req, state).await?;
            let fields = decode_fields::<T>(value)?;
            return Ok(Self {
                fields,
                image: None,
                folder: None,
            });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|rejection| AppError::validation(rejection.body_text()))?;

        let mut map = Map::new();
        let mut image = None;
        let mut folder = None;

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            if name == "image" && field.file_name().is_some() {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await?;
                // Browsers send an empty part when no file was picked.
                if !bytes.is_empty() {
                    image = Some(UploadedImage {
                        file_name,
                        content_type,
                        bytes,
                    });
                }
                continue;
            }

            let text = field.text().await?;
            if name == "folder" {
                folder = Some(text);
            } else if !name.is_empty() {
                map.insert(name, Value::String(text));
            }
        }

        let fields = decode_fields::<T>(Value::Object(map))?;
        Ok(Self {
            fields,
            image,
            folder,
        })
    }
}

/// ValidatedJson
///
/// JSON-only counterpart of `FormPayload`, used by the account endpoints.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state).await?;
        decode_fields(value).map(ValidatedJson)
    }
}

fn decode_fields<T: DeserializeOwned + Validate>(value: Value) -> Result<T, AppError> {
    let fields: T = serde_json::from_value(value)
        .map_err(|e| AppError::validation(format!("Invalid request body: {}", e)))?;
    fields.validate()?;
    Ok(fields)
}

/// Deserializers that accept both native JSON values and the text renditions multipart
/// forms produce. Empty text is treated as absent.
pub mod lenient {
    use serde::{Deserialize, Deserializer, de::Error};
    use std::{fmt::Display, str::FromStr};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw<T> {
        Native(T),
        Text(String),
    }

    pub fn number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + FromStr,
        T::Err: Display,
    {
        match Option::<Raw<T>>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Raw::Native(value)) => Ok(Some(value)),
            Some(Raw::Text(text)) if text.trim().is_empty() => Ok(None),
            Some(Raw::Text(text)) => text.trim().parse().map(Some).map_err(D::Error::custom),
        }
    }

    pub fn flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Raw<bool>>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Raw::Native(value)) => Ok(Some(value)),
            Some(Raw::Text(text)) => match text.trim().to_ascii_lowercase().as_str() {
                "" => Ok(None),
                "true" | "1" | "yes" | "on" => Ok(Some(true)),
                "false" | "0" | "no" | "off" => Ok(Some(false)),
                other => Err(D::Error::custom(format!("invalid boolean: {}", other))),
            },
        }
    }

    /// string_list
    ///
    /// Accepts a JSON array, a JSON-encoded array inside a text value, or a
    /// comma-separated text value.
    pub fn string_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Raw<Vec<String>>>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Raw::Native(values)) => Ok(Some(values)),
            Some(Raw::Text(text)) => {
                let text = text.trim();
                if text.is_empty() {
                    return Ok(Some(Vec::new()));
                }
                if text.starts_with('[') {
                    return serde_json::from_str(text).map(Some).map_err(D::Error::custom);
                }
                Ok(Some(
                    text.split(',')
                        .map(|item| item.trim().to_string())
                        .filter(|item| !item.is_empty())
                        .collect(),
                ))
            }
        }
    }
}
