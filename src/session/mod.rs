pub mod auth;
pub mod messages;
pub mod registry;
pub mod router;
pub mod transport;

pub use auth::{AllowAllAuthenticator, Authenticator, JwtAuthenticator};
pub use messages::{ChatChannel, ClientMessage, LobbyView, ServerMessage};
pub use registry::{ConnectionRegistry, Outbound};
pub use router::SessionRouter;
pub use transport::{ChannelTransport, Transport};
