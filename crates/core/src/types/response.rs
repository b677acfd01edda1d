//! The `{ success, message, data }` envelope wrapping every backend response.

use serde::{Deserialize, Serialize};

/// Response envelope of the REST backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
    #[serde(default)]
    pub meta: Option<ListMeta>,
}

/// Pagination metadata some list endpoints put next to `data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMeta {
    pub total: u32,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl<T> ApiResponse<T> {
    /// Unwrap the payload of a successful response.
    ///
    /// # Errors
    ///
    /// Returns the backend message when `success` is false or `data` is
    /// missing.
    pub fn into_data(self) -> Result<T, String> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            (true, None) => Err(if self.message.is_empty() {
                "response has no data".to_string()
            } else {
                self.message
            }),
            (false, _) => Err(self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_data() {
        let ok: ApiResponse<u32> = ApiResponse {
            success: true,
            message: "ok".into(),
            data: Some(7),
            meta: None,
        };
        assert_eq!(ok.into_data(), Ok(7));

        let rejected: ApiResponse<u32> = ApiResponse {
            success: false,
            message: "Transition invalide".into(),
            data: None,
            meta: None,
        };
        assert_eq!(rejected.into_data(), Err("Transition invalide".to_string()));
    }
}
