pub mod books;
pub mod connection_provider;
pub mod credential_resolver;

pub use books::BooksService;
pub use connection_provider::ConnectionProvider;
pub use credential_resolver::CredentialResolver;
