/// Shared wire types used across the codebase

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::ClientError;

/// Envelope code for a successful call
pub const SUCCESS_CODE: i64 = 200;

/// Envelope codes that mean the access token is missing or expired
pub const UNAUTHORIZED_CODES: [i64; 2] = [401, 10021];

/// The `{code, message, data}` wrapper every console API response uses.
/// The backend also emits the legacy `msg`, `errcode` and `errmsg` fields.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub errcode: Option<String>,
    #[serde(default)]
    pub errmsg: Option<String>,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }

    /// First non-empty server message
    pub fn error_message(&self) -> String {
        [&self.message, &self.msg, &self.errmsg]
            .into_iter()
            .flatten()
            .find(|m| !m.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| "unknown error".to_string())
    }

    /// Unwrap to `data`, or a business failure carrying the server message
    pub fn into_data(self) -> Result<Value, ClientError> {
        if self.is_success() {
            Ok(self.data)
        } else {
            Err(ClientError::business(self.code, self.error_message()))
        }
    }

    /// Envelope code of a raw body without fully decoding it
    pub fn peek_code(body: &[u8]) -> Option<i64> {
        #[derive(Deserialize)]
        struct CodeOnly {
            code: i64,
        }
        serde_json::from_slice::<CodeOnly>(body).ok().map(|c| c.code)
    }

    /// Server message of a raw body, if it is an envelope at all
    pub fn peek_message(body: &[u8]) -> Option<String> {
        serde_json::from_slice::<Envelope>(body)
            .ok()
            .map(|e| e.error_message())
    }
}

/// Paging parameters shared by every list endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page_num: u32,
    pub page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page_num: 1,
            page_size: 10,
            sort_field: None,
            sort_order: None,
            keyword: None,
        }
    }
}

impl PageQuery {
    pub fn page(page_num: u32, page_size: u32) -> Self {
        Self {
            page_num,
            page_size,
            ..Self::default()
        }
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }
}

/// One page of a list endpoint; accepts both `list` and `row` payload shapes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct PageData<T> {
    #[serde(default)]
    pub total: u64,
    #[serde(alias = "row", default = "Vec::new", deserialize_with = "null_as_default")]
    pub list: Vec<T>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub pagesize: Option<u32>,
}

/// Deserialize `null` as the type's default (the backend sends `null` for empty collections)
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
