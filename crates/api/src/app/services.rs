//! Application services behind the routes.
//!
//! Handlers stay thin: they parse the request, call one method here, and map
//! the result. Authorization has already happened by the time any of these
//! run.

use std::sync::Arc;

use chrono::Utc;

use docgate_auth::{
    AuthenticatedPrincipal, JwtClaims, JwtIssuer, PasswordError, PasswordHasher, RoleName,
    RoleStore, TokenValidationError, ensure_default_roles, verify_password,
};
use docgate_core::{DocumentId, DomainError, DomainResult, IngestionId, UserId};
use docgate_infra::{
    Document, FileStorage, FileStorageError, InMemoryRoleStore, InMemoryStore, Ingestion,
    IngestionClient, IngestionError, Store, User, UserStore, extension_of, normalize_email,
};

use crate::app::dto::{
    LoginResponse, RegisterUserRequest, UpdateUserRequest, UploadedFile, UserView,
};
use crate::config::AdminSeed;
use crate::context::PrincipalContext;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Storage(#[from] FileStorageError),
    #[error(transparent)]
    Ingestion(#[from] IngestionError),
    #[error(transparent)]
    Token(#[from] TokenValidationError),
    #[error(transparent)]
    Password(#[from] PasswordError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

pub struct AppServices {
    users: UserStore,
    roles: InMemoryRoleStore,
    documents: InMemoryStore<Document>,
    files: FileStorage,
    ingestion: Arc<dyn IngestionClient>,
    issuer: Arc<dyn JwtIssuer>,
    token_ttl: chrono::Duration,
    passwords: PasswordHasher,
}

impl AppServices {
    pub fn new(
        files: FileStorage,
        ingestion: Arc<dyn IngestionClient>,
        issuer: Arc<dyn JwtIssuer>,
        token_ttl: chrono::Duration,
        passwords: PasswordHasher,
    ) -> Self {
        Self {
            users: UserStore::new(),
            roles: InMemoryRoleStore::new(),
            documents: InMemoryStore::new(),
            files,
            ingestion,
            issuer,
            token_ttl,
            passwords,
        }
    }

    /// Seed default roles, then the configured admin account if its email is
    /// not taken yet. Safe to run on every start.
    pub fn bootstrap(&self, admin: &AdminSeed) -> ServiceResult<()> {
        ensure_default_roles(&self.roles);

        let email = normalize_email(&admin.email)?;
        if self.users.find_by_email(&email).is_some() {
            tracing::debug!(email = %email, "admin user already present");
            return Ok(());
        }

        let now = Utc::now();
        let admin = self.users.save(User {
            id: UserId::new(),
            name: admin.name.clone(),
            email,
            password_hash: self.passwords.hash(&admin.password)?,
            role: RoleName::ADMIN,
            created_at: now,
            updated_at: now,
        })?;
        tracing::info!(user_id = %admin.id, email = %admin.email, "admin user created");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Credentials
    // ---------------------------------------------------------------------

    pub fn login(&self, email: &str, password: &str) -> ServiceResult<LoginResponse> {
        let user = self
            .users
            .find_by_email(email.trim())
            .ok_or(ServiceError::InvalidCredentials)?;
        if !verify_password(password, &user.password_hash)? {
            return Err(ServiceError::InvalidCredentials);
        }

        let claims = JwtClaims::new(user.id.into(), user.email.clone(), Utc::now(), self.token_ttl);
        let access_token = self.issuer.issue(&claims)?;
        tracing::info!(user_id = %user.id, "login succeeded");

        Ok(LoginResponse {
            access_token,
            token_type: "Bearer",
            expires_in: self.token_ttl.num_seconds(),
            user: user.into(),
        })
    }

    /// Resolve the principal for a validated token subject.
    ///
    /// Permissions are read from the role as it is now, so a role or
    /// permission change applies from the next request on. `None` means the
    /// user no longer exists.
    pub fn resolve_principal(&self, user_id: UserId) -> Option<PrincipalContext> {
        let user = self.users.get(&user_id)?;
        let principal = match self.roles.find_by_name(&user.role) {
            Some(role) => AuthenticatedPrincipal::from_role(user.id, &role),
            None => {
                tracing::warn!(user_id = %user.id, role = %user.role.as_str(), "user role not found; no permissions granted");
                AuthenticatedPrincipal::new(user.id, user.role.clone(), std::iter::empty())
            }
        };
        Some(PrincipalContext::new(principal, user.email))
    }

    // ---------------------------------------------------------------------
    // Users
    // ---------------------------------------------------------------------

    pub fn register_user(&self, req: RegisterUserRequest) -> ServiceResult<UserView> {
        let name = validate_name(&req.name)?;
        let email = normalize_email(&req.email)?;
        validate_password(&req.password)?;
        let role = self.known_role(&req.role)?;

        let now = Utc::now();
        let user = self.users.save(User {
            id: UserId::new(),
            name,
            email,
            password_hash: self.passwords.hash(&req.password)?,
            role,
            created_at: now,
            updated_at: now,
        })?;
        tracing::info!(user_id = %user.id, role = %user.role.as_str(), "user registered");
        Ok(user.into())
    }

    pub fn list_users(&self) -> Vec<UserView> {
        self.users.list().into_iter().map(UserView::from).collect()
    }

    pub fn get_user(&self, id: UserId) -> ServiceResult<UserView> {
        Ok(self.user(id)?.into())
    }

    /// Change name, email or password. The role is never touched here.
    pub fn update_user(&self, id: UserId, changes: UpdateUserRequest) -> ServiceResult<UserView> {
        let name = changes.name.as_deref().map(validate_name).transpose()?;
        let email = changes.email.as_deref().map(normalize_email).transpose()?;
        let password_hash = match changes.password {
            Some(password) => {
                validate_password(&password)?;
                Some(self.passwords.hash(&password)?)
            }
            None => None,
        };
        let now = Utc::now();

        let user = self.users.update(&id, |user| {
            if let Some(name) = &name {
                user.name = name.clone();
            }
            if let Some(email) = &email {
                user.email = email.clone();
            }
            if let Some(hash) = &password_hash {
                user.password_hash = hash.clone();
            }
            user.updated_at = now;
        })?;
        Ok(user.into())
    }

    pub fn assign_role(&self, id: UserId, role: &str) -> ServiceResult<UserView> {
        let role = self.known_role(role)?;
        let now = Utc::now();
        let mut previous = None;

        let user = self.users.update(&id, |user| {
            previous = Some(std::mem::replace(&mut user.role, role.clone()));
            user.updated_at = now;
        })?;
        let previous = previous.unwrap_or_else(|| user.role.clone());
        tracing::info!(
            user_id = %user.id,
            from = %previous.as_str(),
            to = %user.role.as_str(),
            "user role changed"
        );
        Ok(user.into())
    }

    pub fn delete_user(&self, id: UserId) -> ServiceResult<UserView> {
        let user = self.users.remove(&id)?;
        tracing::info!(user_id = %user.id, "user deleted");
        Ok(user.into())
    }

    fn user(&self, id: UserId) -> DomainResult<User> {
        self.users.get(&id).ok_or(DomainError::not_found("user"))
    }

    fn known_role(&self, raw: &str) -> DomainResult<RoleName> {
        let name = RoleName::new(raw.trim().to_uppercase());
        if !name.is_default() {
            return Err(DomainError::validation(format!(
                "role must be one of: {}",
                RoleName::DEFAULTS.map(|r| r.as_str().to_string()).join(", ")
            )));
        }
        self.roles
            .find_by_name(&name)
            .map(|role| role.name)
            .ok_or(DomainError::not_found("role"))
    }

    // ---------------------------------------------------------------------
    // Documents
    // ---------------------------------------------------------------------

    pub async fn upload_document(&self, file: UploadedFile) -> ServiceResult<Document> {
        let id = DocumentId::new();
        let extension = extension_of(&file.name);
        let size = self.files.write(id, &extension, &file.bytes).await?;

        let now = Utc::now();
        let document = Document {
            id,
            name: file.name,
            mime_type: file.mime_type,
            size,
            extension,
            created_at: now,
            updated_at: now,
        };
        self.documents.upsert(document.clone());
        tracing::info!(document_id = %id, size, "document uploaded");
        Ok(document)
    }

    pub fn list_documents(&self) -> Vec<Document> {
        self.documents.list()
    }

    pub fn get_document(&self, id: DocumentId) -> ServiceResult<Document> {
        Ok(self.document(id)?)
    }

    /// Replace the stored body and metadata of an existing document.
    pub async fn replace_document(&self, id: DocumentId, file: UploadedFile) -> ServiceResult<Document> {
        self.document(id)?;
        let extension = extension_of(&file.name);
        let size = self.files.write(id, &extension, &file.bytes).await?;

        let now = Utc::now();
        let mut previous_extension = None;
        let updated = self.documents.update(&id, &mut |document: &mut Document| {
            previous_extension = Some(std::mem::replace(&mut document.extension, extension.clone()));
            document.name = file.name.clone();
            document.mime_type = file.mime_type.clone();
            document.size = size;
            document.updated_at = now;
        });

        let Some(document) = updated else {
            // Deleted while the body was being written.
            self.files.remove(id, &extension).await?;
            return Err(DomainError::not_found("document").into());
        };
        if let Some(previous) = previous_extension.filter(|previous| *previous != extension) {
            self.files.remove(id, &previous).await?;
        }
        Ok(document)
    }

    /// Remove the stored body, then the metadata. A body that cannot be
    /// removed leaves the document in place.
    pub async fn delete_document(&self, id: DocumentId) -> ServiceResult<Document> {
        let document = self.document(id)?;
        self.files.remove(id, &document.extension).await?;

        let document = self
            .documents
            .remove(&id)
            .ok_or(DomainError::not_found("document"))?;
        tracing::info!(document_id = %id, "document deleted");
        Ok(document)
    }

    /// Remove every document and its stored body. Returns how many were removed.
    ///
    /// Every document is attempted. Those whose body could not be removed
    /// keep their metadata, and the first such failure is returned.
    pub async fn purge_documents(&self) -> ServiceResult<usize> {
        let mut removed = 0;
        let mut first_failure = None;

        for document in self.documents.list() {
            match self.files.remove(document.id, &document.extension).await {
                Ok(()) => {
                    if self.documents.remove(&document.id).is_some() {
                        removed += 1;
                    }
                }
                Err(e) => {
                    tracing::warn!(document_id = %document.id, error = %e, "document body not removed; keeping metadata");
                    first_failure.get_or_insert(e);
                }
            }
        }

        tracing::info!(count = removed, failed = first_failure.is_some(), "documents purged");
        match first_failure {
            Some(e) => Err(e.into()),
            None => Ok(removed),
        }
    }

    fn document(&self, id: DocumentId) -> DomainResult<Document> {
        self.documents.get(&id).ok_or(DomainError::not_found("document"))
    }

    // ---------------------------------------------------------------------
    // Ingestion
    // ---------------------------------------------------------------------

    pub async fn start_ingestion(&self, document_id: DocumentId, user_id: UserId) -> ServiceResult<Ingestion> {
        self.document(document_id)?;
        Ok(self.ingestion.create(document_id, user_id).await?)
    }

    pub async fn get_ingestion(&self, id: IngestionId) -> ServiceResult<Ingestion> {
        self.ingestion
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found("ingestion").into())
    }

    pub async fn list_ingestions(&self) -> ServiceResult<Vec<Ingestion>> {
        Ok(self.ingestion.list().await?)
    }
}

fn validate_name(name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("name must not be empty"));
    }
    Ok(name.to_string())
}

fn validate_password(password: &str) -> DomainResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use docgate_auth::{Hs256JwtIssuer, Permission};
    use docgate_infra::{IngestionStatus, IngestionWorker, IngestionWorkerConfig};

    use super::*;

    fn admin_seed() -> AdminSeed {
        AdminSeed {
            email: "Admin@Example.com".into(),
            password: "admin-password".into(),
            name: "Admin".into(),
        }
    }

    fn services() -> AppServices {
        let config = IngestionWorkerConfig::default()
            .with_completion_delay(Duration::from_millis(5))
            .with_success_rate(1.0);
        let (client, _handle) =
            IngestionWorker::new(Arc::new(InMemoryStore::<Ingestion>::new()), config).spawn();
        let files = FileStorage::new(std::env::temp_dir().join(format!("docgate-svc-{}", DocumentId::new())));
        let services = AppServices::new(
            files,
            Arc::new(client),
            Arc::new(Hs256JwtIssuer::new("test-secret")),
            chrono::Duration::minutes(5),
            PasswordHasher::new(4).unwrap(),
        );
        services.bootstrap(&admin_seed()).unwrap();
        services
    }

    fn register(services: &AppServices, email: &str, role: &str) -> UserView {
        services
            .register_user(RegisterUserRequest {
                name: "Someone".into(),
                email: email.into(),
                password: "secret1".into(),
                role: role.into(),
            })
            .unwrap()
    }

    fn upload(name: &str, body: &[u8]) -> UploadedFile {
        UploadedFile {
            name: name.into(),
            mime_type: "text/plain".into(),
            bytes: body.to_vec(),
        }
    }

    #[tokio::test]
    async fn bootstrap_is_idempotent() {
        let services = services();
        services.bootstrap(&admin_seed()).unwrap();

        let users = services.list_users();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].email, "admin@example.com");
        assert_eq!(users[0].role, "ADMIN");
    }

    #[tokio::test]
    async fn login_checks_password() {
        let services = services();

        let ok = services.login("ADMIN@example.com", "admin-password").unwrap();
        assert_eq!(ok.token_type, "Bearer");
        assert!(!ok.access_token.is_empty());

        assert!(matches!(
            services.login("admin@example.com", "wrong-password"),
            Err(ServiceError::InvalidCredentials)
        ));
        assert!(matches!(
            services.login("nobody@example.com", "admin-password"),
            Err(ServiceError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn registration_validates_input() {
        let services = services();
        let bad = |name: &str, email: &str, password: &str, role: &str| {
            services
                .register_user(RegisterUserRequest {
                    name: name.into(),
                    email: email.into(),
                    password: password.into(),
                    role: role.into(),
                })
                .unwrap_err()
        };

        assert!(matches!(bad("", "a@b.io", "secret1", "VIEWER"), ServiceError::Domain(DomainError::Validation(_))));
        assert!(matches!(bad("A", "not-an-email", "secret1", "VIEWER"), ServiceError::Domain(DomainError::Validation(_))));
        assert!(matches!(bad("A", "a@b.io", "short", "VIEWER"), ServiceError::Domain(DomainError::Validation(_))));
        assert!(matches!(bad("A", "a@b.io", "secret1", "OWNER"), ServiceError::Domain(DomainError::Validation(_))));
        assert!(matches!(
            bad("A", "admin@EXAMPLE.com", "secret1", "VIEWER"),
            ServiceError::Domain(DomainError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn principal_reflects_current_role() {
        let services = services();
        let user = register(&services, "viewer@example.com", "viewer");

        let before = services.resolve_principal(user.id).unwrap();
        assert_eq!(
            before.principal().permissions().iter().copied().collect::<Vec<_>>(),
            vec![Permission::Read]
        );

        services.assign_role(user.id, "EDITOR").unwrap();
        let after = services.resolve_principal(user.id).unwrap();
        assert_eq!(after.role(), &RoleName::EDITOR);
        assert!(after.principal().permissions().contains(&Permission::Create));

        services.delete_user(user.id).unwrap();
        assert!(services.resolve_principal(user.id).is_none());
    }

    #[tokio::test]
    async fn update_keeps_unique_email() {
        let services = services();
        let a = register(&services, "a@example.com", "VIEWER");
        register(&services, "b@example.com", "VIEWER");

        let err = services
            .update_user(
                a.id,
                UpdateUserRequest {
                    email: Some("B@example.com".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Conflict(_))));

        let renamed = services
            .update_user(
                a.id,
                UpdateUserRequest {
                    name: Some("  Renamed ".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(renamed.name, "Renamed");
        assert_eq!(renamed.email, "a@example.com");
    }

    #[tokio::test]
    async fn updates_never_resurrect_or_revert() {
        let services = services();
        let user = register(&services, "editor@example.com", "EDITOR");

        services.assign_role(user.id, "VIEWER").unwrap();
        let renamed = services
            .update_user(
                user.id,
                UpdateUserRequest {
                    name: Some("Renamed".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(renamed.role, "VIEWER");

        services.delete_user(user.id).unwrap();
        let err = services
            .update_user(
                user.id,
                UpdateUserRequest {
                    name: Some("Back".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::NotFound("user"))));
        assert!(matches!(
            services.assign_role(user.id, "ADMIN"),
            Err(ServiceError::Domain(DomainError::NotFound("user")))
        ));
        assert!(services.resolve_principal(user.id).is_none());
    }

    #[tokio::test]
    async fn password_change_takes_effect() {
        let services = services();
        let user = register(&services, "pw@example.com", "VIEWER");

        services
            .update_user(
                user.id,
                UpdateUserRequest {
                    password: Some("new-secret".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(services.login("pw@example.com", "new-secret").is_ok());
        assert!(matches!(
            services.login("pw@example.com", "secret1"),
            Err(ServiceError::InvalidCredentials)
        ));
    }

    /// Put a directory where the document body should be, so removing it fails.
    async fn jam_body(services: &AppServices, doc: &Document) {
        let path = services.files.path_for(doc.id, &doc.extension);
        tokio::fs::remove_file(&path).await.unwrap();
        tokio::fs::create_dir(&path).await.unwrap();
    }

    #[tokio::test]
    async fn failed_body_removal_keeps_metadata() {
        let services = services();
        let doc = services.upload_document(upload("a.txt", b"a")).await.unwrap();
        jam_body(&services, &doc).await;

        let err = services.delete_document(doc.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Storage(_)));
        assert_eq!(services.get_document(doc.id).unwrap().id, doc.id);
    }

    #[tokio::test]
    async fn purge_attempts_every_document() {
        let services = services();
        let jammed = services.upload_document(upload("a.txt", b"a")).await.unwrap();
        let fine = services.upload_document(upload("b.txt", b"b")).await.unwrap();
        let also_fine = services.upload_document(upload("c.txt", b"c")).await.unwrap();
        jam_body(&services, &jammed).await;

        assert!(matches!(services.purge_documents().await, Err(ServiceError::Storage(_))));

        let left: Vec<_> = services.list_documents().into_iter().map(|d| d.id).collect();
        assert_eq!(left, vec![jammed.id]);
        assert!(!services.files.path_for(fine.id, "txt").exists());
        assert!(!services.files.path_for(also_fine.id, "txt").exists());
    }

    #[tokio::test]
    async fn document_lifecycle_touches_files() {
        let services = services();

        let doc = services.upload_document(upload("Report.PDF", b"hello")).await.unwrap();
        assert_eq!(doc.extension, "pdf");
        assert_eq!(doc.size, 5);
        let first_path = services.files.path_for(doc.id, "pdf");
        assert!(first_path.exists());

        let replaced = services
            .replace_document(doc.id, upload("report.txt", b"hello world"))
            .await
            .unwrap();
        assert_eq!(replaced.size, 11);
        assert!(!first_path.exists());
        assert!(services.files.path_for(doc.id, "txt").exists());

        services.delete_document(doc.id).await.unwrap();
        assert!(!services.files.path_for(doc.id, "txt").exists());
        assert!(matches!(
            services.get_document(doc.id),
            Err(ServiceError::Domain(DomainError::NotFound("document")))
        ));
    }

    #[tokio::test]
    async fn purge_removes_everything() {
        let services = services();
        services.upload_document(upload("a.txt", b"a")).await.unwrap();
        services.upload_document(upload("b.txt", b"b")).await.unwrap();

        assert_eq!(services.purge_documents().await.unwrap(), 2);
        assert!(services.list_documents().is_empty());
        assert_eq!(services.purge_documents().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn ingestion_requires_existing_document() {
        let services = services();
        let user = UserId::new();

        let missing = services.start_ingestion(DocumentId::new(), user).await.unwrap_err();
        assert!(matches!(missing, ServiceError::Domain(DomainError::NotFound("document"))));

        let doc = services.upload_document(upload("a.txt", b"a")).await.unwrap();
        let started = services.start_ingestion(doc.id, user).await.unwrap();
        assert_eq!(started.status, IngestionStatus::Processing);
        assert_eq!(services.get_ingestion(started.id).await.unwrap().document_id, doc.id);

        let duplicate = services.start_ingestion(doc.id, user).await.unwrap_err();
        assert!(matches!(duplicate, ServiceError::Ingestion(IngestionError::DuplicateDocument(_))));
        assert_eq!(services.list_ingestions().await.unwrap().len(), 1);
    }
}
