pub mod resolver;
pub mod server;
pub mod transport;

pub use resolver::RecursiveResolver;
pub use server::DnsServer;
