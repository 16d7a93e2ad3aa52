pub mod syn_flood;
pub mod tcp_connection;
pub mod tcp_flood;
pub mod udp_flood;

pub use syn_flood::SynFlood;
pub use tcp_connection::TcpConnection;
pub use tcp_flood::TcpFlood;
pub use udp_flood::UdpFlood;
