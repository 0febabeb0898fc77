use axum::http::HeaderMap;

use billbook_core::{DomainError, TenantId};
use billbook_infra::Session;

/// Header naming the tenant that owns the request's records.
pub const TENANT_HEADER: &str = "x-tenant-id";

/// Session for a request.
///
/// No header means an anonymous session: reads come back empty and writes
/// are refused. A header that is not a tenant id is an error.
pub fn session_from_headers(headers: &HeaderMap) -> Result<Session, DomainError> {
    let Some(raw) = headers.get(TENANT_HEADER) else {
        return Ok(Session::anonymous());
    };
    let raw = raw
        .to_str()
        .map_err(|_| DomainError::invalid_id(format!("{TENANT_HEADER} is not valid text")))?
        .trim();
    if raw.is_empty() {
        return Ok(Session::anonymous());
    }
    let tenant_id: TenantId = raw.parse()?;
    Ok(Session::owned_by(tenant_id))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn header_selects_the_owner() {
        let tenant_id = TenantId::new();
        let mut headers = HeaderMap::new();
        headers.insert(TENANT_HEADER, HeaderValue::from_str(&tenant_id.to_string()).unwrap());
        assert_eq!(session_from_headers(&headers).unwrap().owner(), Some(tenant_id));
    }

    #[test]
    fn missing_header_is_anonymous() {
        let session = session_from_headers(&HeaderMap::new()).unwrap();
        assert_eq!(session.owner(), None);
    }

    #[test]
    fn garbage_header_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(TENANT_HEADER, HeaderValue::from_static("tenant-7"));
        assert!(matches!(session_from_headers(&headers), Err(DomainError::InvalidId(_))));
    }
}
