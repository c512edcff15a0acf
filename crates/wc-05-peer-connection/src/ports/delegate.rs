use shared_types::Hash;
use wc_04_message_codec::Message;

use crate::adapters::PeerHandle;
use crate::domain::DispatchError;

/// Business logic the connections hand their messages to.
///
/// Called from connection tasks, so implementations must not block on
/// network I/O; replies go through [`PeerHandle::send`], which only queues.
pub trait ConnectionDelegate: Send + Sync + 'static {
    /// One decoded message from `peer`.
    fn on_message(&self, peer: &PeerHandle, message: Message) -> Result<(), DispatchError>;

    /// A previously seen message by content id, used to answer requests.
    fn get_message(&self, id: &Hash) -> Option<Message>;

    fn on_connect_peer(&self, peer: &PeerHandle);

    /// Fires exactly once per connection, whatever closed it.
    fn on_disconnect_peer(&self, peer: &PeerHandle);
}
