pub mod connection;
pub mod events;
pub mod pacer;
pub mod serializer;

pub use connection::{ConnectionState, MqttConnection};
pub use events::ConnectionEvent;
pub use pacer::Pacer;
pub use serializer::JsonSerializer;
