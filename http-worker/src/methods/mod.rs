pub mod http_bypass;
pub mod http_flood;
pub mod slow_loris;
pub mod ssl_flood;

pub use http_bypass::HttpBypass;
pub use http_flood::HttpFlood;
pub use slow_loris::SlowLoris;
pub use ssl_flood::SslFlood;
