mod tcp_backend_sender;

pub use tcp_backend_sender::{SenderConfig, TcpBackendSender};
