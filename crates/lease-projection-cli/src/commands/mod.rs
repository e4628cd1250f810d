pub mod fingerprint;
pub mod projection;
pub mod rent;
pub mod scenario;
