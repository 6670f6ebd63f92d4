//! In-memory Supabase for tests.
//!
//! [`FakeConnector`] stands in for [`SupabaseClient`](crate::supabase::SupabaseClient):
//! every connection gets its own [`FakeAuth`] over a shared account list,
//! and all connections share one [`FakeDatastore`]. Row-level security is
//! not modelled. Knobs make calls hang, slow down or fail so timeout paths
//! can be driven under a paused Tokio clock.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use nullbyte_core::{ProfileId, Role, UserId};
use serde_json::{Value, json};
use tokio::sync::broadcast;

use crate::models::UserProfile;
use crate::supabase::{
    AuthChangeEvent, AuthEvent, AuthProvider, Connection, Datastore, Query, Session, SignUpData,
    SignUpOutcome, SupabaseConnector, SupabaseError, User, UserAttributes, UserDirectory,
};

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn api_error(status: u16, code: &str, message: &str) -> SupabaseError {
    SupabaseError::Api {
        status,
        code: Some(code.to_owned()),
        message: message.to_owned(),
    }
}

/// A confirmed auth user with a random id.
#[must_use]
pub fn user(email: &str) -> User {
    User {
        id: UserId::random(),
        email: Some(email.to_owned()),
        user_metadata: json!({}),
        created_at: Some(Utc::now()),
        last_sign_in_at: None,
        email_confirmed_at: Some(Utc::now()),
    }
}

/// A one-hour session for `user` carrying `token`.
#[must_use]
pub fn session_for(user: &User, token: &str) -> Session {
    Session {
        access_token: token.to_owned(),
        refresh_token: format!("refresh-{token}"),
        token_type: "bearer".to_owned(),
        expires_in: 3600,
        expires_at: Some(Utc::now().timestamp() + 3600),
        user: user.clone(),
    }
}

/// A profile named "Test User".
#[must_use]
pub fn profile_for(user: &User, role: Role) -> UserProfile {
    UserProfile {
        id: ProfileId::random(),
        user_id: user.id,
        full_name: Some("Test User".to_owned()),
        email: user.email.clone(),
        role,
        avatar_url: None,
        created_at: Some(Utc::now()),
        updated_at: None,
    }
}

/// A `user_profiles` row as PostgREST returns it.
#[must_use]
pub fn profile_row(user_id: UserId, full_name: &str, role: Role) -> Value {
    json!({
        "id": ProfileId::random(),
        "user_id": user_id,
        "full_name": full_name,
        "email": null,
        "role": role,
        "avatar_url": null,
        "created_at": Utc::now(),
        "updated_at": null
    })
}

#[derive(Clone)]
struct Account {
    user: User,
    password: String,
}

/// Auth users shared by every connection of a [`FakeConnector`].
#[derive(Clone, Default)]
pub struct FakeAccounts(Arc<Mutex<Vec<Account>>>);

impl FakeAccounts {
    /// Register a confirmed user.
    pub fn add(&self, email: &str, password: &str, full_name: Option<&str>) -> User {
        let mut user = user(email);
        if let Some(name) = full_name {
            user.user_metadata = json!({ "full_name": name });
        }
        lock(&self.0).push(Account {
            user: user.clone(),
            password: password.to_owned(),
        });
        user
    }

    #[must_use]
    pub fn find(&self, email: &str) -> Option<User> {
        lock(&self.0)
            .iter()
            .find(|a| a.user.email.as_deref() == Some(email))
            .map(|a| a.user.clone())
    }

    #[must_use]
    pub fn users(&self) -> Vec<User> {
        lock(&self.0).iter().map(|a| a.user.clone()).collect()
    }

    /// The user with this email and password, if any.
    #[must_use]
    pub fn check(&self, email: &str, password: &str) -> Option<User> {
        lock(&self.0)
            .iter()
            .find(|a| a.user.email.as_deref() == Some(email) && a.password == password)
            .map(|a| a.user.clone())
    }

    fn set_password(&self, id: UserId, password: &str) {
        if let Some(account) = lock(&self.0).iter_mut().find(|a| a.user.id == id) {
            password.clone_into(&mut account.password);
        }
    }

    fn remove(&self, id: UserId) -> bool {
        let mut accounts = lock(&self.0);
        let before = accounts.len();
        accounts.retain(|a| a.user.id != id);
        accounts.len() != before
    }
}

/// GoTrue for one visitor.
pub struct FakeAuth {
    accounts: FakeAccounts,
    session: Mutex<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
    hang_sessions: AtomicBool,
    autoconfirm: AtomicBool,
    recoveries: Arc<Mutex<Vec<(String, String)>>>,
}

impl FakeAuth {
    #[must_use]
    pub fn new(accounts: FakeAccounts) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            accounts,
            session: Mutex::new(None),
            events,
            hang_sessions: AtomicBool::new(false),
            autoconfirm: AtomicBool::new(false),
            recoveries: Arc::default(),
        }
    }

    /// Set the stored session without emitting an event, as if restored
    /// from storage.
    pub fn restore(&self, session: Option<Session>) {
        *lock(&self.session) = session;
    }

    /// Push a transition to subscribers and store its session.
    pub fn emit(&self, kind: AuthChangeEvent, session: Option<Session>) {
        self.restore(session.clone());
        let _ = self.events.send(AuthEvent::new(kind, session));
    }

    pub fn hang_sessions(&self) {
        self.hang_sessions.store(true, Ordering::SeqCst);
    }

    pub fn autoconfirm(&self) {
        self.autoconfirm.store(true, Ordering::SeqCst);
    }

    fn new_session(user: &User) -> Session {
        let n = NEXT_TOKEN.fetch_add(1, Ordering::SeqCst);
        session_for(user, &format!("token-{n}"))
    }
}

#[async_trait]
impl AuthProvider for FakeAuth {
    async fn get_session(&self) -> Result<Option<Session>, SupabaseError> {
        if self.hang_sessions.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(lock(&self.session).clone())
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        data: &SignUpData,
    ) -> Result<SignUpOutcome, SupabaseError> {
        if self.accounts.find(email).is_some() {
            return Err(api_error(422, "user_already_exists", "User already registered"));
        }
        let user = self.accounts.add(email, password, data.full_name.as_deref());
        let session = self
            .autoconfirm
            .load(Ordering::SeqCst)
            .then(|| Self::new_session(&user));
        if let Some(session) = &session {
            self.emit(AuthChangeEvent::SignedIn, Some(session.clone()));
        }
        Ok(SignUpOutcome {
            user: Some(user),
            session,
        })
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, SupabaseError> {
        let user = self
            .accounts
            .check(email, password)
            .ok_or_else(|| api_error(400, "invalid_credentials", "Invalid login credentials"))?;
        let session = Self::new_session(&user);
        self.emit(AuthChangeEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), SupabaseError> {
        self.emit(AuthChangeEvent::SignedOut, None);
        Ok(())
    }

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), SupabaseError> {
        lock(&self.recoveries).push((email.to_owned(), redirect_to.to_owned()));
        Ok(())
    }

    /// The fake's recovery token is the account's email.
    async fn verify_recovery(&self, token_hash: &str) -> Result<Session, SupabaseError> {
        let user = self
            .accounts
            .find(token_hash)
            .ok_or_else(|| api_error(403, "otp_expired", "Email link is invalid or has expired"))?;
        let session = Self::new_session(&user);
        self.emit(AuthChangeEvent::PasswordRecovery, Some(session.clone()));
        Ok(session)
    }

    async fn update_user(&self, attributes: &UserAttributes) -> Result<User, SupabaseError> {
        let session = lock(&self.session).clone().ok_or(SupabaseError::NoSession)?;
        if let Some(password) = &attributes.password {
            self.accounts.set_password(session.user.id, password);
        }
        let user = session.user.clone();
        self.emit(AuthChangeEvent::UserUpdated, Some(session));
        Ok(user)
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

/// PostgREST over in-memory tables.
#[derive(Default)]
pub struct FakeDatastore {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    queries: Mutex<Vec<Query>>,
    hanging: Mutex<HashSet<String>>,
    delays: Mutex<HashMap<String, Duration>>,
    failing: Mutex<HashMap<String, u16>>,
    rpc_calls: Mutex<Vec<(String, Value)>>,
    fail_rpc: AtomicBool,
}

impl FakeDatastore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append rows to a table.
    pub fn seed(&self, table: &str, rows: impl IntoIterator<Item = Value>) {
        lock(&self.tables)
            .entry(table.to_owned())
            .or_default()
            .extend(rows);
    }

    /// Replace a table's rows.
    pub fn replace(&self, table: &str, rows: impl IntoIterator<Item = Value>) {
        lock(&self.tables).insert(table.to_owned(), rows.into_iter().collect());
    }

    #[must_use]
    pub fn rows(&self, table: &str) -> Vec<Value> {
        lock(&self.tables).get(table).cloned().unwrap_or_default()
    }

    /// Every call against `table` never completes.
    pub fn hang_table(&self, table: &str) {
        lock(&self.hanging).insert(table.to_owned());
    }

    /// Every call against `table` takes `delay` before answering.
    pub fn delay_table(&self, table: &str, delay: Duration) {
        lock(&self.delays).insert(table.to_owned(), delay);
    }

    /// Every call against `table` fails with `status`.
    pub fn fail_table(&self, table: &str, status: u16) {
        lock(&self.failing).insert(table.to_owned(), status);
    }

    pub fn fail_rpc(&self) {
        self.fail_rpc.store(true, Ordering::SeqCst);
    }

    /// Every query issued so far, including ones that failed.
    #[must_use]
    pub fn queries(&self) -> Vec<Query> {
        lock(&self.queries).clone()
    }

    #[must_use]
    pub fn queries_on(&self, table: &str) -> usize {
        lock(&self.queries)
            .iter()
            .filter(|q| q.table_name() == table)
            .count()
    }

    #[must_use]
    pub fn rpc_calls(&self) -> Vec<(String, Value)> {
        lock(&self.rpc_calls).clone()
    }

    async fn gate(&self, query: &Query) -> Result<(), SupabaseError> {
        lock(&self.queries).push(query.clone());
        let table = query.table_name();

        let hang = lock(&self.hanging).contains(table);
        let delay = lock(&self.delays).get(table).copied();
        let failure = lock(&self.failing).get(table).copied();

        if hang {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(status) = failure {
            return Err(api_error(status, "fake", "injected failure"));
        }
        Ok(())
    }

    fn matching(&self, query: &Query) -> Vec<Value> {
        let tables = lock(&self.tables);
        let mut rows: Vec<Value> = tables
            .get(query.table_name())
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.filters().iter().all(|f| f.matches(row)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        for order in query.ordering().iter().rev() {
            rows.sort_by(|a, b| {
                let ordering = compare(&a[&order.column], &b[&order.column]);
                if order.ascending { ordering } else { ordering.reverse() }
            });
        }
        if let Some(limit) = query.row_limit() {
            rows.truncate(limit);
        }
        rows
    }
}

fn compare(a: &Value, b: &Value) -> std::cmp::Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(std::cmp::Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Null, Value::Null) => std::cmp::Ordering::Equal,
        (Value::Null, _) => std::cmp::Ordering::Less,
        (_, Value::Null) => std::cmp::Ordering::Greater,
        _ => a.to_string().cmp(&b.to_string()),
    }
}

fn merge(row: &mut Value, patch: &Value) {
    if let (Some(row), Some(patch)) = (row.as_object_mut(), patch.as_object()) {
        for (key, value) in patch {
            row.insert(key.clone(), value.clone());
        }
    }
}

#[async_trait]
impl Datastore for FakeDatastore {
    async fn select(&self, query: &Query) -> Result<Vec<Value>, SupabaseError> {
        if query.is_empty_selection() {
            return Ok(Vec::new());
        }
        self.gate(query).await?;
        Ok(self.matching(query))
    }

    async fn single(&self, query: &Query) -> Result<Value, SupabaseError> {
        self.gate(query).await?;
        let mut rows = self.matching(query);
        match rows.len() {
            0 => Err(SupabaseError::NoRows),
            1 => Ok(rows.remove(0)),
            n => Err(api_error(406, "PGRST116", &format!("{n} rows returned"))),
        }
    }

    async fn insert(&self, table: &str, row: &Value) -> Result<Value, SupabaseError> {
        self.gate(&Query::table(table)).await?;
        let mut row = row.clone();
        if let Some(fields) = row.as_object_mut() {
            fields
                .entry("id")
                .or_insert_with(|| json!(uuid::Uuid::new_v4()));
            fields.entry("created_at").or_insert_with(|| json!(Utc::now()));
        }
        lock(&self.tables)
            .entry(table.to_owned())
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    async fn upsert(
        &self,
        table: &str,
        row: &Value,
        on_conflict: &str,
    ) -> Result<Value, SupabaseError> {
        self.gate(&Query::table(table)).await?;
        let key = row.get(on_conflict).cloned().unwrap_or(Value::Null);
        {
            let mut tables = lock(&self.tables);
            let rows = tables.entry(table.to_owned()).or_default();
            if let Some(existing) = rows.iter_mut().find(|r| r.get(on_conflict) == Some(&key)) {
                merge(existing, row);
                return Ok(existing.clone());
            }
        }
        self.insert(table, row).await
    }

    async fn update(&self, query: &Query, patch: &Value) -> Result<Vec<Value>, SupabaseError> {
        self.gate(query).await?;
        let mut tables = lock(&self.tables);
        let Some(rows) = tables.get_mut(query.table_name()) else {
            return Ok(Vec::new());
        };
        let mut updated = Vec::new();
        for row in rows.iter_mut() {
            if query.filters().iter().all(|f| f.matches(row)) {
                merge(row, patch);
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn delete(&self, query: &Query) -> Result<(), SupabaseError> {
        self.gate(query).await?;
        if let Some(rows) = lock(&self.tables).get_mut(query.table_name()) {
            rows.retain(|row| !query.filters().iter().all(|f| f.matches(row)));
        }
        Ok(())
    }

    async fn count(&self, query: &Query) -> Result<u64, SupabaseError> {
        self.gate(query).await?;
        Ok(self.matching(query).len() as u64)
    }

    async fn rpc(&self, function: &str, args: &Value) -> Result<Value, SupabaseError> {
        lock(&self.rpc_calls).push((function.to_owned(), args.clone()));
        if self.fail_rpc.load(Ordering::SeqCst) {
            return Err(api_error(500, "fake", "rpc failed"));
        }
        Ok(Value::Null)
    }
}

/// GoTrue admin API over the shared account list.
pub struct FakeDirectory {
    accounts: FakeAccounts,
}

impl FakeDirectory {
    #[must_use]
    pub const fn new(accounts: FakeAccounts) -> Self {
        Self { accounts }
    }
}

#[async_trait]
impl UserDirectory for FakeDirectory {
    async fn list_users(&self) -> Result<Vec<User>, SupabaseError> {
        Ok(self.accounts.users())
    }

    async fn delete_user(&self, id: UserId) -> Result<(), SupabaseError> {
        if self.accounts.remove(id) {
            Ok(())
        } else {
            Err(api_error(404, "user_not_found", "User not found"))
        }
    }
}

/// A whole fake project.
pub struct FakeConnector {
    pub accounts: FakeAccounts,
    pub db: Arc<FakeDatastore>,
    directory: Option<Arc<FakeDirectory>>,
    auths: Mutex<Vec<Arc<FakeAuth>>>,
    resume: Mutex<Option<User>>,
    hang_sessions: AtomicBool,
    autoconfirm: AtomicBool,
    connections: AtomicUsize,
}

impl Default for FakeConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeConnector {
    /// A project with the admin API available.
    #[must_use]
    pub fn new() -> Self {
        let accounts = FakeAccounts::default();
        Self {
            directory: Some(Arc::new(FakeDirectory::new(accounts.clone()))),
            accounts,
            db: Arc::new(FakeDatastore::new()),
            auths: Mutex::default(),
            resume: Mutex::default(),
            hang_sessions: AtomicBool::new(false),
            autoconfirm: AtomicBool::new(false),
            connections: AtomicUsize::new(0),
        }
    }

    /// A project without a service role key.
    #[must_use]
    pub fn without_directory() -> Self {
        Self {
            directory: None,
            ..Self::new()
        }
    }

    /// The next connection starts signed in as `user`.
    pub fn resume_session_as(&self, user: &User) {
        *lock(&self.resume) = Some(user.clone());
    }

    /// Session fetches on new connections never complete.
    pub fn hang_sessions(&self) {
        self.hang_sessions.store(true, Ordering::SeqCst);
    }

    /// Sign-ups on new connections return a session.
    pub fn autoconfirm(&self) {
        self.autoconfirm.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Every password reset requested on any connection.
    #[must_use]
    pub fn recovery_requests(&self) -> Vec<(String, String)> {
        lock(&self.auths)
            .iter()
            .flat_map(|auth| lock(&auth.recoveries).clone())
            .collect()
    }
}

impl SupabaseConnector for FakeConnector {
    fn connect(&self) -> Result<Connection, SupabaseError> {
        let auth = Arc::new(FakeAuth::new(self.accounts.clone()));
        if self.hang_sessions.load(Ordering::SeqCst) {
            auth.hang_sessions();
        }
        if self.autoconfirm.load(Ordering::SeqCst) {
            auth.autoconfirm();
        }
        if let Some(user) = lock(&self.resume).take() {
            auth.restore(Some(FakeAuth::new_session(&user)));
        }
        lock(&self.auths).push(auth.clone());
        self.connections.fetch_add(1, Ordering::SeqCst);

        Ok(Connection {
            auth,
            db: self.db.clone(),
        })
    }

    fn user_directory(&self) -> Option<Arc<dyn UserDirectory>> {
        self.directory
            .clone()
            .map(|d| d as Arc<dyn UserDirectory>)
    }
}
