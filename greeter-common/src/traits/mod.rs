pub mod store_traits;
pub mod audio_traits;
pub mod staging_traits;

pub use store_traits::{BlobStore, Document, DocumentStore};
pub use audio_traits::{
    AudioEncoder, ChannelGate, CompletionReceiver, EncodedAudio, StreamCompletion, VoiceConnection,
    VoiceConnector, VoiceSink,
};
pub use staging_traits::FileStaging;
