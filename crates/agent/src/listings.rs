use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use intake_core::{ApplicationError, DomainError, NewProperty, Property};
use intake_db::repositories::{PropertyRepository, RepositoryError};

/// Attempts at drawing a free identifier before giving up.
pub const MAX_IDENTIFIER_ATTEMPTS: usize = 5;
const NOTIFY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ListingError {
    #[error("invalid listing: {0}")]
    Invalid(String),
    #[error("property identifier `{0}` is already assigned")]
    DuplicateIdentifier(String),
    #[error("no free property identifier after {0} attempts")]
    IdentifierExhausted(usize),
    #[error(transparent)]
    Storage(#[from] RepositoryError),
}

impl From<ListingError> for ApplicationError {
    fn from(error: ListingError) -> Self {
        match error {
            ListingError::Invalid(message) => DomainError::InvalidListing(message).into(),
            ListingError::DuplicateIdentifier(identifier) => {
                DomainError::DuplicateIdentifier(identifier).into()
            }
            error @ (ListingError::IdentifierExhausted(_) | ListingError::Storage(_)) => {
                Self::Persistence(error.to_string())
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("automation webhook transport failure: {0}")]
    Transport(String),
    #[error("automation webhook returned status {0}")]
    Status(u16),
}

/// Told about every newly created listing.
#[async_trait]
pub trait ListingNotifier: Send + Sync {
    async fn listing_created(&self, property: &Property) -> Result<(), NotifyError>;
}

pub struct NoopNotifier;

#[async_trait]
impl ListingNotifier for NoopNotifier {
    async fn listing_created(&self, _property: &Property) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Posts a multipart form describing the listing, plus its image file, to
/// an automation webhook.
pub struct HttpListingNotifier {
    client: Client,
    webhook_url: String,
    media_root: PathBuf,
}

impl HttpListingNotifier {
    pub fn new(
        webhook_url: impl Into<String>,
        media_root: impl Into<PathBuf>,
    ) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(NOTIFY_TIMEOUT)
            .build()
            .map_err(|e| NotifyError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, webhook_url: webhook_url.into(), media_root: media_root.into() })
    }

    async fn image_part(&self, image: &str) -> Option<Part> {
        let path = match self.resolve_image(image).await {
            Ok(path) => path,
            Err(reason) => {
                warn!(
                    event_name = "listing.notify.image_rejected",
                    image = %image,
                    reason = %reason,
                    "listing image outside the media root; notifying without file"
                );
                return None;
            }
        };
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(error) => {
                warn!(
                    event_name = "listing.notify.image_missing",
                    path = %path.display(),
                    error = %error,
                    "listing image not readable; notifying without file"
                );
                return None;
            }
        };
        let file_name = Path::new(image)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| image.to_string());
        Part::bytes(bytes).file_name(file_name).mime_str("image/jpeg").ok()
    }

    /// Resolves `image` under the media root, following symlinks, and refuses
    /// anything that lands outside it.
    async fn resolve_image(&self, image: &str) -> Result<PathBuf, String> {
        if !is_media_relative(image) {
            return Err("path is not relative to the media root".to_string());
        }
        let root = tokio::fs::canonicalize(&self.media_root)
            .await
            .map_err(|e| format!("media root unavailable: {e}"))?;
        let path = tokio::fs::canonicalize(root.join(image))
            .await
            .map_err(|e| format!("image not readable: {e}"))?;
        if !path.starts_with(&root) {
            return Err("path escapes the media root".to_string());
        }
        Ok(path)
    }
}

/// True for a non-empty relative path made only of plain segments: no root,
/// no drive prefix, no `.` or `..`.
pub fn is_media_relative(image: &str) -> bool {
    let path = Path::new(image);
    path.components().next().is_some()
        && path.components().all(|component| matches!(component, Component::Normal(_)))
}

pub fn image_url_field(property: &Property) -> String {
    match &property.image_urls {
        Some(urls) => serde_json::to_string(urls).unwrap_or_default(),
        None => String::new(),
    }
}

#[async_trait]
impl ListingNotifier for HttpListingNotifier {
    async fn listing_created(&self, property: &Property) -> Result<(), NotifyError> {
        let mut form = Form::new()
            .text("title", property.name.clone())
            .text("description", property.description.clone())
            .text("price", property.price.to_string())
            .text("location", property.location.clone())
            .text("image_url", image_url_field(property));
        if let Some(part) = self.image_part(&property.image).await {
            form = form.part("image", part);
        }

        let response = self
            .client
            .post(&self.webhook_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }
        Ok(())
    }
}

/// Keeps every notified listing in memory.
#[derive(Default)]
pub struct RecordingNotifier {
    notified: Mutex<Vec<Property>>,
}

impl RecordingNotifier {
    pub async fn notified(&self) -> Vec<Property> {
        self.notified.lock().await.clone()
    }
}

#[async_trait]
impl ListingNotifier for RecordingNotifier {
    async fn listing_created(&self, property: &Property) -> Result<(), NotifyError> {
        self.notified.lock().await.push(property.clone());
        Ok(())
    }
}

pub struct ListingService {
    properties: Arc<dyn PropertyRepository>,
    notifier: Arc<dyn ListingNotifier>,
}

impl ListingService {
    pub fn new(
        properties: Arc<dyn PropertyRepository>,
        notifier: Arc<dyn ListingNotifier>,
    ) -> Self {
        Self { properties, notifier }
    }

    /// Stores a new listing and fires the creation notification.
    ///
    /// A generated identifier that collides is redrawn; a caller-supplied one
    /// that collides is an error.
    pub async fn create(&self, listing: NewProperty) -> Result<Property, ListingError> {
        validate(&listing)?;
        let explicit_identifier = listing
            .property_identifier
            .as_deref()
            .map(str::trim)
            .filter(|identifier| !identifier.is_empty())
            .map(str::to_string);

        let mut attempts = 0;
        let property = loop {
            attempts += 1;
            let property = listing.clone().into_property(&mut rand::thread_rng());
            match self.properties.insert(property.clone()).await {
                Ok(()) => break property,
                Err(RepositoryError::Conflict(_)) => {
                    if let Some(identifier) = &explicit_identifier {
                        return Err(ListingError::DuplicateIdentifier(identifier.clone()));
                    }
                    if attempts >= MAX_IDENTIFIER_ATTEMPTS {
                        return Err(ListingError::IdentifierExhausted(attempts));
                    }
                }
                Err(error) => return Err(error.into()),
            }
        };

        info!(
            event_name = "listing.created",
            property_identifier = %property.property_identifier,
            name = %property.name,
            "property listing created"
        );
        self.notify(property.clone());
        Ok(property)
    }

    pub async fn list(&self) -> Result<Vec<Property>, ListingError> {
        Ok(self.properties.list_recent().await?)
    }

    fn notify(&self, property: Property) {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            if let Err(error) = notifier.listing_created(&property).await {
                warn!(
                    event_name = "listing.notify.failed",
                    property_identifier = %property.property_identifier,
                    error = %error,
                    "automation webhook notification failed"
                );
            }
        });
    }
}

fn validate(listing: &NewProperty) -> Result<(), ListingError> {
    if listing.name.trim().is_empty() {
        return Err(ListingError::Invalid("name must not be empty".to_string()));
    }
    if listing.price < Decimal::ZERO {
        return Err(ListingError::Invalid("price must not be negative".to_string()));
    }
    if listing.bedrooms < 0 || listing.bathrooms < 0 {
        return Err(ListingError::Invalid("room counts must not be negative".to_string()));
    }
    if let Some(image) = listing.image.as_deref() {
        if !is_media_relative(image) {
            return Err(ListingError::Invalid(format!(
                "image `{image}` must be a relative path under the media root"
            )));
        }
    }
    if let Some(identifier) = listing.property_identifier.as_deref().map(str::trim) {
        if !identifier.is_empty() && !identifier.chars().all(|c| c.is_ascii_digit()) {
            return Err(ListingError::Invalid(format!(
                "property identifier `{identifier}` must be numeric"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use rust_decimal::Decimal;

    use intake_core::NewProperty;
    use intake_db::repositories::{InMemoryPropertyRepository, PropertyRepository};

    use super::{
        is_media_relative, HttpListingNotifier, ListingError, ListingService, RecordingNotifier,
    };

    fn listing(identifier: Option<&str>) -> NewProperty {
        NewProperty {
            name: "Palm Court Duplex".to_string(),
            description: "Four bedroom duplex".to_string(),
            price: Decimal::new(185_000, 0),
            location: "Lekki".to_string(),
            bedrooms: 4,
            bathrooms: 3,
            is_available: true,
            image: None,
            image_urls: None,
            property_identifier: identifier.map(str::to_string),
        }
    }

    async fn wait_for_notifications(notifier: &RecordingNotifier, count: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while notifier.notified().await.len() < count {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("notification delivered");
    }

    #[tokio::test]
    async fn generated_identifier_is_five_digits_and_notified() {
        let repository = Arc::new(InMemoryPropertyRepository::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let service = ListingService::new(repository.clone(), notifier.clone());

        let property = service.create(listing(None)).await.expect("create");

        let identifier = property.property_identifier.as_str();
        assert_eq!(identifier.len(), 5);
        assert!(identifier.chars().all(|c| c.is_ascii_digit()));
        assert!(repository.find_by_identifier(identifier).await.expect("lookup").is_some());

        wait_for_notifications(&notifier, 1).await;
        assert_eq!(notifier.notified().await[0].id, property.id);
    }

    #[tokio::test]
    async fn explicit_duplicate_identifier_is_rejected() {
        let repository = Arc::new(InMemoryPropertyRepository::default());
        let service = ListingService::new(repository, Arc::new(RecordingNotifier::default()));

        service.create(listing(Some("47237"))).await.expect("first");
        let error = service.create(listing(Some("47237"))).await.expect_err("duplicate");

        assert!(matches!(error, ListingError::DuplicateIdentifier(ref id) if id == "47237"));
    }

    #[tokio::test]
    async fn invalid_listing_is_rejected_before_storage() {
        let repository = Arc::new(InMemoryPropertyRepository::default());
        let service =
            ListingService::new(repository.clone(), Arc::new(RecordingNotifier::default()));

        let mut negative = listing(None);
        negative.price = Decimal::new(-1, 0);
        assert!(matches!(service.create(negative).await, Err(ListingError::Invalid(_))));
        assert!(matches!(
            service.create(listing(Some("PC-1"))).await,
            Err(ListingError::Invalid(_))
        ));
        assert!(repository.list_recent().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn identifier_survives_later_saves() {
        let repository = Arc::new(InMemoryPropertyRepository::default());
        let service =
            ListingService::new(repository.clone(), Arc::new(RecordingNotifier::default()));
        let created = service.create(listing(None)).await.expect("create");

        for round in 0..3 {
            let mut edited = created.clone();
            edited.is_available = round % 2 == 0;
            edited.property_identifier = intake_core::PropertyIdentifier("00000".to_string());
            repository.save(edited).await.expect("save");
        }

        let stored =
            repository.find_by_id(&created.id).await.expect("lookup").expect("still stored");
        assert_eq!(stored.property_identifier, created.property_identifier);
    }

    #[test]
    fn media_paths_must_stay_relative() {
        assert!(is_media_relative("property_images/default.jpg"));
        assert!(!is_media_relative("../secrets.env"));
        assert!(!is_media_relative("property_images/../../etc/passwd"));
        assert!(!is_media_relative("/etc/passwd"));
        assert!(!is_media_relative("./property_images/a.jpg"));
        assert!(!is_media_relative(""));
    }

    #[tokio::test]
    async fn listing_with_escaping_image_is_rejected() {
        let repository = Arc::new(InMemoryPropertyRepository::default());
        let service =
            ListingService::new(repository.clone(), Arc::new(RecordingNotifier::default()));

        for image in ["../../etc/passwd", "/etc/passwd"] {
            let mut escaping = listing(None);
            escaping.image = Some(image.to_string());
            assert!(matches!(service.create(escaping).await, Err(ListingError::Invalid(_))));
        }

        let mut inside = listing(None);
        inside.image = Some("property_images/palm-court.jpg".to_string());
        service.create(inside).await.expect("relative image accepted");
        assert_eq!(repository.list_recent().await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn notifier_reads_images_only_under_media_root() {
        let workspace = tempfile::tempdir().expect("tempdir");
        let media_root = workspace.path().join("media");
        std::fs::create_dir_all(media_root.join("property_images")).expect("media dir");
        std::fs::write(media_root.join("property_images/a.jpg"), b"jpeg").expect("image");
        std::fs::write(workspace.path().join("outside.txt"), b"secret").expect("outside");

        let notifier =
            HttpListingNotifier::new("http://127.0.0.1:9/hook", &media_root).expect("notifier");

        assert!(notifier.image_part("property_images/a.jpg").await.is_some());
        assert!(notifier.image_part("../outside.txt").await.is_none());
        let absolute = workspace.path().join("outside.txt");
        assert!(notifier.image_part(&absolute.to_string_lossy()).await.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn notifier_refuses_symlink_out_of_media_root() {
        let workspace = tempfile::tempdir().expect("tempdir");
        let media_root = workspace.path().join("media");
        std::fs::create_dir_all(&media_root).expect("media dir");
        std::fs::write(workspace.path().join("outside.txt"), b"secret").expect("outside");
        std::os::unix::fs::symlink(workspace.path().join("outside.txt"), media_root.join("link.jpg"))
            .expect("symlink");

        let notifier =
            HttpListingNotifier::new("http://127.0.0.1:9/hook", &media_root).expect("notifier");

        assert!(notifier.image_part("link.jpg").await.is_none());
    }
}
