#[cfg(feature = "backend-opencv")]
pub mod opencv;
pub mod stub;
#[cfg(feature = "backend-tract")]
pub mod tract;

#[cfg(feature = "backend-opencv")]
pub use self::opencv::OpencvBackend;
pub use stub::StubBackend;
#[cfg(feature = "backend-tract")]
pub use self::tract::TractBackend;
