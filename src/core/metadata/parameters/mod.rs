/// Metadata supplied by the wallet, also known as the Authorization Server Metadata.
pub mod wallet;
