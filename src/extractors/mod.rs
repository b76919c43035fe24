pub mod tenant;

pub use tenant::{bearer_token, tenant_from_headers, AuthenticatedPrincipal, CurrentTenantPool, TENANT_ID_HEADER};
