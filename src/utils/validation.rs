use crate::utils::error::{CepError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

// ---- 設定檔欄位驗證 ----

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(CepError::InvalidConfigValue {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(CepError::InvalidConfigValue {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(CepError::InvalidConfigValue {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(CepError::InvalidConfigValue {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_socket_addr(field_name: &str, value: &str) -> Result<()> {
    value
        .parse::<std::net::SocketAddr>()
        .map(|_| ())
        .map_err(|e| CepError::InvalidConfigValue {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Invalid socket address: {}", e),
        })
}

// ---- 輸入資料驗證 ----

pub fn is_postal_code(value: &str) -> bool {
    value.len() == 8 && value.bytes().all(|b| b.is_ascii_digit())
}

pub fn is_state_code(value: &str) -> bool {
    value.len() == 2 && value.bytes().all(|b| b.is_ascii_uppercase())
}

pub fn validate_postal_code(field_name: &str, value: &str) -> Result<()> {
    if !is_postal_code(value) {
        return Err(CepError::validation(
            field_name,
            "must contain exactly 8 numeric digits",
        ));
    }
    Ok(())
}

pub fn validate_state_code(field_name: &str, value: &str) -> Result<()> {
    if !is_state_code(value) {
        return Err(CepError::validation(
            field_name,
            "must contain exactly 2 uppercase letters",
        ));
    }
    Ok(())
}

pub fn validate_required_text(field_name: &str, value: &str, max_len: usize) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CepError::validation(field_name, "is required"));
    }
    validate_max_length(field_name, value, max_len)
}

pub fn validate_optional_text(field_name: &str, value: Option<&str>, max_len: usize) -> Result<()> {
    match value {
        Some(v) => validate_max_length(field_name, v, max_len),
        None => Ok(()),
    }
}

/// 選填的數字欄位 (IBGE、GIA、DDD、SIAFI)
pub fn validate_optional_digits(field_name: &str, value: Option<&str>, max_len: usize) -> Result<()> {
    let Some(v) = value else {
        return Ok(());
    };
    if !v.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CepError::validation(field_name, "must contain only digits"));
    }
    if v.len() > max_len {
        return Err(CepError::validation(
            field_name,
            format!("must contain at most {} digits", max_len),
        ));
    }
    Ok(())
}

fn validate_max_length(field_name: &str, value: &str, max_len: usize) -> Result<()> {
    if value.chars().count() > max_len {
        return Err(CepError::validation(
            field_name,
            format!("must be at most {} characters", max_len),
        ));
    }
    Ok(())
}

/// 移除 CEP 中的格式符號，例如 "01310-100" -> "01310100"
pub fn strip_postal_code(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("viacep_url", "https://viacep.com.br/ws").is_ok());
        assert!(validate_url("viacep_url", "http://localhost:8080").is_ok());
        assert!(validate_url("viacep_url", "").is_err());
        assert!(validate_url("viacep_url", "invalid-url").is_err());
        assert!(validate_url("viacep_url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("viacep_timeout_secs", 5, 1).is_ok());
        assert!(validate_positive_number("viacep_timeout_secs", 0, 1).is_err());
    }

    #[test]
    fn test_validate_socket_addr() {
        assert!(validate_socket_addr("bind", "0.0.0.0:8080").is_ok());
        assert!(validate_socket_addr("bind", "localhost").is_err());
    }

    #[test]
    fn test_postal_code_shape() {
        assert!(is_postal_code("01310100"));
        assert!(!is_postal_code("01310-100"));
        assert!(!is_postal_code("0131010"));
        assert!(!is_postal_code("013101000"));
        assert!(!is_postal_code("0131010a"));
        // 全形數字不算
        assert!(!is_postal_code("０１３１０１００"));
    }

    #[test]
    fn test_state_code_shape() {
        assert!(is_state_code("SP"));
        assert!(!is_state_code("sp"));
        assert!(!is_state_code("S"));
        assert!(!is_state_code("SPX"));
        assert!(!is_state_code("S1"));
    }

    #[test]
    fn test_optional_digits() {
        assert!(validate_optional_digits("area_code", None, 3).is_ok());
        assert!(validate_optional_digits("area_code", Some("11"), 3).is_ok());
        assert!(validate_optional_digits("area_code", Some(""), 3).is_ok());
        assert!(validate_optional_digits("area_code", Some("1111"), 3).is_err());
        assert!(validate_optional_digits("area_code", Some("1a"), 3).is_err());
    }

    #[test]
    fn test_required_text() {
        assert!(validate_required_text("city", "São Paulo", 100).is_ok());
        assert!(validate_required_text("city", "   ", 100).is_err());
        assert!(validate_required_text("city", &"a".repeat(101), 100).is_err());
        // 以字元計算，不是位元組
        assert!(validate_required_text("city", &"ã".repeat(100), 100).is_ok());
    }

    #[test]
    fn test_strip_postal_code() {
        assert_eq!(strip_postal_code("01310-100"), "01310100");
        assert_eq!(strip_postal_code("01.310-100"), "01310100");
        assert_eq!(strip_postal_code("01310100"), "01310100");
    }
}
