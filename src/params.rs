//! Parameter Parser — extracts and validates path variables `id`, `width`,
//! `height`, `extension` and query flags `blur` / `grayscale`.

use std::fmt;
use std::str::FromStr;

use axum::extract::{Path, Query};
use serde::Deserialize;

use crate::error::AppError;

const MAX_DIMENSION: u32 = 5000;
const DEFAULT_BLUR_AMOUNT: u8 = 5;
const MIN_BLUR_AMOUNT: u8 = 1;
const MAX_BLUR_AMOUNT: u8 = 10;

/// Output format, derived from the path's trailing extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extension {
    Jpeg,
    WebP,
}

impl Extension {
    pub fn as_ext_str(&self) -> &'static str {
        match self {
            Extension::Jpeg => ".jpg",
            Extension::WebP => ".webp",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Extension::Jpeg => "image/jpeg",
            Extension::WebP => "image/webp",
        }
    }
}

impl FromStr for Extension {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ".jpg" => Ok(Extension::Jpeg),
            ".webp" => Ok(Extension::WebP),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ext_str())
    }
}

/// Validated, immutable request parameters.
#[derive(Debug, Clone)]
pub struct Params {
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub extension: Extension,
    pub blur_amount: Option<u8>,
    pub grayscale: bool,
}

impl Params {
    pub fn blur(&self) -> bool {
        self.blur_amount.is_some()
    }
}

/// Raw path segments as axum sees them:
/// `/id/{id}/{width}/{height}{extension}`.
///
/// `height_ext` carries the trailing `{height}{extension}` portion joined
/// together (axum has no native "number followed by free-form suffix"
/// path matcher), so it is split by hand during validation.
#[derive(Debug, Deserialize)]
pub struct PathParams {
    pub id: String,
    pub width: String,
    pub height_ext: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct QueryParams {
    pub hmac: Option<String>,
    pub blur: Option<String>,
    pub grayscale: Option<String>,
}

/// Parse and validate a request's raw path + query into [`Params`].
/// Signature verification happens separately (§4.4); this only validates
/// shape.
pub fn parse(
    Path(path): Path<PathParams>,
    Query(query): Query<QueryParams>,
) -> Result<Params, AppError> {
    if path.id.is_empty() {
        return Err(AppError::InvalidParameters("empty id".into()));
    }

    let width = parse_dimension(&path.width, "width")?;
    let (height_str, extension_str) = split_height_and_extension(&path.height_ext)?;
    let height = parse_dimension(height_str, "height")?;
    let extension = Extension::from_str(extension_str)
        .map_err(|_| AppError::InvalidParameters(format!("invalid extension: {extension_str}")))?;

    let blur_amount = match query.blur.as_deref() {
        None => None,
        Some("") => Some(DEFAULT_BLUR_AMOUNT),
        Some(v) => {
            // `blur` present as a bare flag (no `=value`) also lands here as
            // the string "true" depending on the query-string library; treat
            // any non-numeric value as "flag present, use default".
            match v.parse::<u8>() {
                Ok(n) => Some(validate_blur_amount(n)?),
                Err(_) if v.eq_ignore_ascii_case("true") => Some(DEFAULT_BLUR_AMOUNT),
                Err(_) => {
                    return Err(AppError::InvalidParameters(format!(
                        "invalid blur amount: {v}"
                    )))
                }
            }
        }
    };

    let grayscale = query.grayscale.is_some();

    Ok(Params {
        id: path.id,
        width,
        height,
        extension,
        blur_amount,
        grayscale,
    })
}

fn parse_dimension(raw: &str, field: &str) -> Result<u32, AppError> {
    let n: i64 = raw
        .parse()
        .map_err(|_| AppError::InvalidParameters(format!("{field} is not an integer")))?;
    if n <= 0 {
        return Err(AppError::InvalidParameters(format!(
            "{field} must be positive"
        )));
    }
    if n as u64 > MAX_DIMENSION as u64 {
        return Err(AppError::InvalidParameters(format!(
            "{field} exceeds maximum of {MAX_DIMENSION}"
        )));
    }
    Ok(n as u32)
}

fn validate_blur_amount(n: u8) -> Result<u8, AppError> {
    if !(MIN_BLUR_AMOUNT..=MAX_BLUR_AMOUNT).contains(&n) {
        return Err(AppError::InvalidParameters(format!(
            "blur amount must be in [{MIN_BLUR_AMOUNT}, {MAX_BLUR_AMOUNT}]"
        )));
    }
    Ok(n)
}

/// Split `"100.jpg"` into `("100", ".jpg")`. The extension is everything
/// from the first `.` onward, matching the route's `{extension}` pattern
/// of `\..*`.
fn split_height_and_extension(raw: &str) -> Result<(&str, &str), AppError> {
    match raw.find('.') {
        Some(idx) if idx > 0 => Ok((&raw[..idx], &raw[idx..])),
        _ => Err(AppError::InvalidParameters(
            "missing extension".to_string(),
        )),
    }
}
