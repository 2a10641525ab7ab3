//! Integration-wide constants

pub const DOMAIN: &str = "huawei_mesh_router";

pub const MANUFACTURER: &str = "Huawei";

pub const DEFAULT_NAME: &str = "Huawei Router";
pub const DEFAULT_HOST: &str = "192.168.3.1";
pub const DEFAULT_PORT: u16 = 80;
pub const DEFAULT_USER: &str = "admin";
pub const DEFAULT_SSL: bool = false;
pub const DEFAULT_VERIFY_SSL: bool = true;

/// Seconds between coordinator refreshes
pub const DEFAULT_SCAN_INTERVAL: u64 = 30;
pub const MIN_SCAN_INTERVAL: u64 = 5;

/// Name used for the primary router until its info has been fetched
pub const PRIMARY_ROUTER_DEFAULT_NAME: &str = "Primary router";
