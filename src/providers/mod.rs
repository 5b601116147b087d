#[cfg(feature = "provider-hosted")]
pub mod hosted;
#[cfg(feature = "provider-webui")]
pub mod webui;

#[cfg(feature = "provider-hosted")]
pub use hosted::HostedImages;
#[cfg(feature = "provider-webui")]
pub use webui::WebUiImages;
