use serde::Deserialize;

/// Returns the trimmed value when it is present and not blank.
pub fn required(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// One-time codes arrive either as JSON strings or as bare numbers.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(untagged)]
pub enum OtpInput {
    Text(String),
    Number(u64),
}

impl OtpInput {
    pub fn into_text(self) -> String {
        match self {
            OtpInput::Text(text) => text,
            OtpInput::Number(number) => number.to_string(),
        }
    }
}
