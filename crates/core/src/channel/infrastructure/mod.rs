pub mod long_polling_transport;
pub mod service_factory;
pub mod websocket_transport;
