//! In-memory repository implementations (feature `test-support`).
//!
//! [`MemoryStore`] implements every repository trait over one shared,
//! mutex-guarded state, with the same ordering, uniqueness and cascade
//! rules as the PostgreSQL schema. The lock is never held across an await.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use appflow_core::flow::{assign_positions, normalize_techno_name};
use appflow_core::roles::{ROLE_ADMIN, ROLE_EDIT_APPS, ROLE_EDIT_FLOWS, ROLE_USER};
use appflow_core::types::DbId;
use async_trait::async_trait;
use chrono::Utc;

use crate::models::app::{App, CreateApp, UpdateApp};
use crate::models::flow::{
    Flow, FlowChanges, FlowTechnoOrder, FlowTechnoStep, FlowWithRelations, NewFlow,
};
use crate::models::role::Role;
use crate::models::search_outbox::{SearchOperation, SearchOutboxEntry};
use crate::models::techno::{CreateTechno, Techno};
use crate::models::user::{CreateUser, User, UserWithRoles};
use crate::repositories::{
    AppRepository, FlowRepository, HealthProbe, Repositories, SearchOutboxRepository,
    TechnoRepository, UserRepository,
};

#[derive(Default)]
struct State {
    next_id: DbId,
    apps: BTreeMap<DbId, App>,
    technos: BTreeMap<DbId, Techno>,
    flows: BTreeMap<DbId, Flow>,
    orders: Vec<FlowTechnoOrder>,
    users: BTreeMap<DbId, User>,
    roles: BTreeMap<DbId, Role>,
    user_roles: Vec<(DbId, DbId)>,
    outbox: BTreeMap<DbId, SearchOutboxEntry>,
}

impl State {
    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn check_app(&self, id: DbId) -> Result<(), sqlx::Error> {
        if self.apps.contains_key(&id) {
            Ok(())
        } else {
            Err(sqlx::Error::Protocol(format!(
                "foreign key violation: app {id} does not exist"
            )))
        }
    }

    fn check_technos(&self, ids: &[DbId]) -> Result<(), sqlx::Error> {
        match ids.iter().find(|id| !self.technos.contains_key(id)) {
            Some(id) => Err(sqlx::Error::Protocol(format!(
                "foreign key violation: techno {id} does not exist"
            ))),
            None => Ok(()),
        }
    }

    fn write_chain(&mut self, flow_id: DbId, techno_ids: &[DbId]) {
        self.orders.retain(|o| o.flow_id != flow_id);
        for (position, techno_id) in assign_positions(techno_ids.to_vec()) {
            let id = self.next_id();
            self.orders.push(FlowTechnoOrder {
                id,
                flow_id,
                techno_id,
                position,
            });
        }
    }

    fn with_relations(&self, flow: &Flow) -> Result<FlowWithRelations, sqlx::Error> {
        let source_app = self
            .apps
            .get(&flow.source_app_id)
            .cloned()
            .ok_or(sqlx::Error::RowNotFound)?;
        let dest_app = self
            .apps
            .get(&flow.dest_app_id)
            .cloned()
            .ok_or(sqlx::Error::RowNotFound)?;
        let mut technos: Vec<FlowTechnoStep> = self
            .orders
            .iter()
            .filter(|o| o.flow_id == flow.id)
            .filter_map(|o| {
                self.technos.get(&o.techno_id).map(|t| FlowTechnoStep {
                    position: o.position,
                    techno: t.clone(),
                })
            })
            .collect();
        technos.sort_by_key(|s| s.position);
        Ok(FlowWithRelations {
            flow: flow.clone(),
            source_app,
            dest_app,
            technos,
        })
    }

    fn user_with_roles(&self, user: &User) -> UserWithRoles {
        let mut roles: Vec<String> = self
            .user_roles
            .iter()
            .filter(|(user_id, _)| *user_id == user.id)
            .filter_map(|(_, role_id)| self.roles.get(role_id).map(|r| r.name.clone()))
            .collect();
        roles.sort();
        UserWithRoles {
            user: user.clone(),
            roles,
        }
    }
}

/// Shared in-memory backing store. Clones share the same data.
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store seeded with the well-known roles.
    pub fn new() -> Self {
        let mut state = State::default();
        let now = Utc::now();
        for name in [ROLE_USER, ROLE_EDIT_APPS, ROLE_EDIT_FLOWS, ROLE_ADMIN] {
            let id = state.next_id();
            state.roles.insert(
                id,
                Role {
                    id,
                    name: name.to_string(),
                    description: None,
                    created_at: now,
                    updated_at: now,
                },
            );
        }
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Bundle this store as every repository.
    pub fn repositories(&self) -> Repositories {
        Repositories {
            apps: Arc::new(self.clone()),
            technos: Arc::new(self.clone()),
            flows: Arc::new(self.clone()),
            users: Arc::new(self.clone()),
            outbox: Arc::new(self.clone()),
            health: Arc::new(self.clone()),
        }
    }

    /// Every stored chain row, for assertions on positions.
    pub fn flow_techno_orders(&self, flow_id: DbId) -> Vec<FlowTechnoOrder> {
        let mut rows: Vec<FlowTechnoOrder> = self
            .lock()
            .orders
            .iter()
            .filter(|o| o.flow_id == flow_id)
            .cloned()
            .collect();
        rows.sort_by_key(|o| o.position);
        rows
    }

    /// Total number of chain rows across all flows.
    pub fn flow_techno_order_count(&self) -> usize {
        self.lock().orders.len()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl AppRepository for MemoryStore {
    async fn list(&self) -> Result<Vec<App>, sqlx::Error> {
        Ok(self.lock().apps.values().cloned().collect())
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<App>, sqlx::Error> {
        Ok(self.lock().apps.get(&id).cloned())
    }

    async fn create(&self, input: &CreateApp) -> Result<App, sqlx::Error> {
        let mut state = self.lock();
        let id = state.next_id();
        let now = Utc::now();
        let app = App {
            id,
            name: input.name.clone(),
            description: input.description.clone(),
            created_at: now,
            updated_at: now,
        };
        state.apps.insert(id, app.clone());
        Ok(app)
    }

    async fn update(&self, id: DbId, input: &UpdateApp) -> Result<Option<App>, sqlx::Error> {
        let mut state = self.lock();
        let Some(app) = state.apps.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &input.name {
            app.name = name.clone();
        }
        if let Some(description) = &input.description {
            app.description = Some(description.clone());
        }
        app.updated_at = Utc::now();
        Ok(Some(app.clone()))
    }

    async fn delete(&self, id: DbId) -> Result<bool, sqlx::Error> {
        let mut state = self.lock();
        let referenced = state
            .flows
            .values()
            .any(|f| f.source_app_id == id || f.dest_app_id == id);
        if referenced {
            return Err(sqlx::Error::Protocol(format!(
                "foreign key violation: app {id} is referenced by a flow"
            )));
        }
        Ok(state.apps.remove(&id).is_some())
    }
}

#[async_trait]
impl TechnoRepository for MemoryStore {
    async fn list(&self) -> Result<Vec<Techno>, sqlx::Error> {
        let mut technos: Vec<Techno> = self.lock().technos.values().cloned().collect();
        technos.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(technos)
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<Techno>, sqlx::Error> {
        Ok(self.lock().technos.get(&id).cloned())
    }

    async fn create_or_get(&self, input: &CreateTechno) -> Result<Techno, sqlx::Error> {
        let name = normalize_techno_name(&input.name);
        let mut state = self.lock();
        if let Some(existing) = state.technos.values_mut().find(|t| t.name == name) {
            if let Some(description) = &input.description {
                existing.description = Some(description.clone());
                existing.updated_at = Utc::now();
            }
            return Ok(existing.clone());
        }
        let id = state.next_id();
        let now = Utc::now();
        let techno = Techno {
            id,
            name,
            description: input.description.clone(),
            created_at: now,
            updated_at: now,
        };
        state.technos.insert(id, techno.clone());
        Ok(techno)
    }
}

#[async_trait]
impl FlowRepository for MemoryStore {
    async fn list_with_relations(&self) -> Result<Vec<FlowWithRelations>, sqlx::Error> {
        let state = self.lock();
        state
            .flows
            .values()
            .map(|f| state.with_relations(f))
            .collect()
    }

    async fn find_with_relations(
        &self,
        id: DbId,
    ) -> Result<Option<FlowWithRelations>, sqlx::Error> {
        let state = self.lock();
        state
            .flows
            .get(&id)
            .map(|f| state.with_relations(f))
            .transpose()
    }

    async fn create(&self, input: &NewFlow) -> Result<FlowWithRelations, sqlx::Error> {
        let mut state = self.lock();
        state.check_app(input.source_app_id)?;
        state.check_app(input.dest_app_id)?;
        state.check_technos(&input.techno_ids)?;

        let id = state.next_id();
        let now = Utc::now();
        let flow = Flow {
            id,
            name: input.name.clone(),
            description: input.description.clone(),
            source_app_id: input.source_app_id,
            dest_app_id: input.dest_app_id,
            created_at: now,
            updated_at: now,
        };
        state.flows.insert(id, flow.clone());
        state.write_chain(id, &input.techno_ids);
        state.with_relations(&flow)
    }

    async fn update(
        &self,
        id: DbId,
        changes: &FlowChanges,
    ) -> Result<Option<FlowWithRelations>, sqlx::Error> {
        let mut state = self.lock();
        let Some(mut flow) = state.flows.get(&id).cloned() else {
            return Ok(None);
        };
        if let Some(app_id) = changes.source_app_id {
            state.check_app(app_id)?;
            flow.source_app_id = app_id;
        }
        if let Some(app_id) = changes.dest_app_id {
            state.check_app(app_id)?;
            flow.dest_app_id = app_id;
        }
        if let Some(techno_ids) = &changes.techno_ids {
            state.check_technos(techno_ids)?;
        }
        if let Some(name) = &changes.name {
            flow.name = name.clone();
        }
        if let Some(description) = &changes.description {
            flow.description = Some(description.clone());
        }
        flow.updated_at = Utc::now();

        state.flows.insert(id, flow.clone());
        if let Some(techno_ids) = &changes.techno_ids {
            state.write_chain(id, techno_ids);
        }
        state.with_relations(&flow).map(Some)
    }

    async fn delete(&self, id: DbId) -> Result<bool, sqlx::Error> {
        let mut state = self.lock();
        let removed = state.flows.remove(&id).is_some();
        if removed {
            state.orders.retain(|o| o.flow_id != id);
        }
        Ok(removed)
    }

    async fn count_by_app(&self, app_id: DbId) -> Result<i64, sqlx::Error> {
        let state = self.lock();
        Ok(state
            .flows
            .values()
            .filter(|f| f.source_app_id == app_id || f.dest_app_id == app_id)
            .count() as i64)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_with_roles(&self, id: DbId) -> Result<Option<UserWithRoles>, sqlx::Error> {
        let state = self.lock();
        Ok(state.users.get(&id).map(|u| state.user_with_roles(u)))
    }

    async fn list_with_roles(&self) -> Result<Vec<UserWithRoles>, sqlx::Error> {
        let state = self.lock();
        Ok(state
            .users
            .values()
            .map(|u| state.user_with_roles(u))
            .collect())
    }

    async fn create(&self, input: &CreateUser) -> Result<UserWithRoles, sqlx::Error> {
        let mut state = self.lock();
        let taken = state
            .users
            .values()
            .any(|u| u.username == input.username || u.email == input.email);
        if taken {
            return Err(sqlx::Error::Protocol(format!(
                "unique violation: user {} already exists",
                input.username
            )));
        }

        let id = state.next_id();
        let now = Utc::now();
        let user = User {
            id,
            username: input.username.clone(),
            email: input.email.clone(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let role_ids: Vec<DbId> = state
            .roles
            .values()
            .filter(|r| input.roles.contains(&r.name))
            .map(|r| r.id)
            .collect();
        for role_id in role_ids {
            state.user_roles.push((id, role_id));
        }
        state.users.insert(id, user.clone());
        Ok(state.user_with_roles(&user))
    }

    async fn set_active(&self, id: DbId, is_active: bool) -> Result<bool, sqlx::Error> {
        let mut state = self.lock();
        match state.users.get_mut(&id) {
            Some(user) => {
                user.is_active = is_active;
                user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_roles(&self) -> Result<Vec<Role>, sqlx::Error> {
        Ok(self.lock().roles.values().cloned().collect())
    }
}

#[async_trait]
impl SearchOutboxRepository for MemoryStore {
    async fn enqueue(
        &self,
        index_name: &str,
        object_id: &str,
        operation: SearchOperation,
    ) -> Result<SearchOutboxEntry, sqlx::Error> {
        let mut state = self.lock();
        let now = Utc::now();
        if let Some(entry) = state
            .outbox
            .values_mut()
            .find(|e| e.index_name == index_name && e.object_id == object_id)
        {
            entry.operation = operation.as_str().to_string();
            entry.revision += 1;
            entry.attempts = 0;
            entry.last_error = None;
            entry.claimed_until = None;
            entry.updated_at = now;
            return Ok(entry.clone());
        }
        let id = state.next_id();
        let entry = SearchOutboxEntry {
            id,
            index_name: index_name.to_string(),
            object_id: object_id.to_string(),
            operation: operation.as_str().to_string(),
            revision: 0,
            attempts: 0,
            last_error: None,
            claimed_until: None,
            created_at: now,
            updated_at: now,
        };
        state.outbox.insert(id, entry.clone());
        Ok(entry)
    }

    async fn list_pending(&self, limit: i64) -> Result<Vec<SearchOutboxEntry>, sqlx::Error> {
        let limit = usize::try_from(limit).unwrap_or(0);
        let mut entries: Vec<SearchOutboxEntry> = self.lock().outbox.values().cloned().collect();
        entries.sort_by_key(|e| (e.attempts, e.id));
        entries.truncate(limit);
        Ok(entries)
    }

    async fn claim_pending(
        &self,
        limit: i64,
        lease_secs: i64,
    ) -> Result<Vec<SearchOutboxEntry>, sqlx::Error> {
        let limit = usize::try_from(limit).unwrap_or(0);
        let now = Utc::now();
        let mut state = self.lock();
        let mut ids: Vec<(i32, DbId)> = state
            .outbox
            .values()
            .filter(|e| e.claimed_until.map_or(true, |until| until < now))
            .map(|e| (e.attempts, e.id))
            .collect();
        ids.sort_unstable();
        ids.truncate(limit);

        let lease_until = now + chrono::Duration::seconds(lease_secs);
        let mut claimed = Vec::with_capacity(ids.len());
        for (_, id) in ids {
            if let Some(entry) = state.outbox.get_mut(&id) {
                entry.claimed_until = Some(lease_until);
                claimed.push(entry.clone());
            }
        }
        Ok(claimed)
    }

    async fn record_failure(&self, id: DbId, error: &str) -> Result<(), sqlx::Error> {
        if let Some(entry) = self.lock().outbox.get_mut(&id) {
            entry.attempts += 1;
            entry.last_error = Some(error.to_string());
            entry.claimed_until = None;
            entry.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn complete(&self, id: DbId, revision: i32) -> Result<bool, sqlx::Error> {
        let mut state = self.lock();
        match state.outbox.get(&id) {
            Some(entry) if entry.revision == revision => {
                state.outbox.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn count(&self) -> Result<i64, sqlx::Error> {
        Ok(self.lock().outbox.len() as i64)
    }
}

#[async_trait]
impl HealthProbe for MemoryStore {
    async fn ping(&self) -> Result<(), sqlx::Error> {
        Ok(())
    }
}
