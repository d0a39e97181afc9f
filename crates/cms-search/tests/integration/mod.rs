#[cfg(feature = "local")]
mod local_search;
mod remote_tenant;
