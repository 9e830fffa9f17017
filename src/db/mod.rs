mod schema;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::Utc;
use rusqlite::Connection;
use uuid::Uuid;

use crate::finance;
use crate::models::*;

/// Rejected writes that violate the domain's numeric ranges.
///
/// The aggregation formulas in [`crate::finance`] assume valid inputs, so
/// these are enforced here, at the write boundary, and surfaced to API
/// clients as bad requests.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("progress must be between 0 and 100")]
    ProgressOutOfRange,
    #[error("amount must not be negative")]
    NegativeAmount,
    #[error("price must not be negative")]
    NegativePrice,
}

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "tally")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        let db_path = dirs.data_dir().join("tally.db");
        Self::open(db_path)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Customer operations
    // ============================================================

    pub fn get_all_customers(&self) -> Result<Vec<Customer>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, name, email, phone, created_at, updated_at
             FROM customers ORDER BY name",
        )?;

        let customers = stmt
            .query_map([], |row| {
                Ok(Customer {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    name: row.get(1)?,
                    email: row.get(2)?,
                    phone: row.get(3)?,
                    created_at: parse_datetime(row.get::<_, String>(4)?),
                    updated_at: parse_datetime(row.get::<_, String>(5)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(customers)
    }

    pub fn get_customer(&self, id: Uuid) -> Result<Option<Customer>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, name, email, phone, created_at, updated_at
             FROM customers WHERE id = ?",
        )?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Customer {
                id: parse_uuid(row.get::<_, String>(0)?),
                name: row.get(1)?,
                email: row.get(2)?,
                phone: row.get(3)?,
                created_at: parse_datetime(row.get::<_, String>(4)?),
                updated_at: parse_datetime(row.get::<_, String>(5)?),
            }))
        } else {
            Ok(None)
        }
    }

    pub fn create_customer(&self, input: CreateCustomerInput) -> Result<Customer> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO customers (id, name, email, phone, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                &input.name,
                &input.email,
                &input.phone,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(Customer {
            id,
            name: input.name,
            email: input.email,
            phone: input.phone,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update_customer(&self, id: Uuid, input: UpdateCustomerInput) -> Result<Option<Customer>> {
        let Some(existing) = self.get_customer(id)? else {
            return Ok(None);
        };

        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();
        let name = input.name.unwrap_or(existing.name);
        let email = input.email.or(existing.email);
        let phone = input.phone.or(existing.phone);

        conn.execute(
            "UPDATE customers SET name = ?, email = ?, phone = ?, updated_at = ? WHERE id = ?",
            (&name, &email, &phone, now.to_rfc3339(), id.to_string()),
        )?;

        Ok(Some(Customer {
            id,
            name,
            email,
            phone,
            created_at: existing.created_at,
            updated_at: now,
        }))
    }

    pub fn delete_customer(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM customers WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    // ============================================================
    // Project operations
    // ============================================================

    pub fn get_all_projects(&self) -> Result<Vec<Project>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, customer_id, name, description, created_at, updated_at
             FROM projects ORDER BY name",
        )?;

        let projects = stmt
            .query_map([], |row| {
                Ok(Project {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    customer_id: parse_uuid(row.get::<_, String>(1)?),
                    name: row.get(2)?,
                    description: row.get(3)?,
                    created_at: parse_datetime(row.get::<_, String>(4)?),
                    updated_at: parse_datetime(row.get::<_, String>(5)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(projects)
    }

    pub fn get_projects_by_customer(&self, customer_id: Uuid) -> Result<Vec<Project>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, customer_id, name, description, created_at, updated_at
             FROM projects WHERE customer_id = ? ORDER BY name",
        )?;

        let projects = stmt
            .query_map([customer_id.to_string()], |row| {
                Ok(Project {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    customer_id: parse_uuid(row.get::<_, String>(1)?),
                    name: row.get(2)?,
                    description: row.get(3)?,
                    created_at: parse_datetime(row.get::<_, String>(4)?),
                    updated_at: parse_datetime(row.get::<_, String>(5)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(projects)
    }

    pub fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, customer_id, name, description, created_at, updated_at
             FROM projects WHERE id = ?",
        )?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Project {
                id: parse_uuid(row.get::<_, String>(0)?),
                customer_id: parse_uuid(row.get::<_, String>(1)?),
                name: row.get(2)?,
                description: row.get(3)?,
                created_at: parse_datetime(row.get::<_, String>(4)?),
                updated_at: parse_datetime(row.get::<_, String>(5)?),
            }))
        } else {
            Ok(None)
        }
    }

    pub fn create_project(&self, input: CreateProjectInput) -> Result<Project> {
        // Verify customer exists
        self.get_customer(input.customer_id)?
            .ok_or_else(|| anyhow::anyhow!("Customer not found"))?;

        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO projects (id, customer_id, name, description, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                input.customer_id.to_string(),
                &input.name,
                &input.description,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(Project {
            id,
            customer_id: input.customer_id,
            name: input.name,
            description: input.description,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update_project(&self, id: Uuid, input: UpdateProjectInput) -> Result<Option<Project>> {
        let Some(existing) = self.get_project(id)? else {
            return Ok(None);
        };

        let customer_id = input.customer_id.unwrap_or(existing.customer_id);
        if customer_id != existing.customer_id {
            self.get_customer(customer_id)?
                .ok_or_else(|| anyhow::anyhow!("Customer not found"))?;
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();
        let name = input.name.unwrap_or(existing.name);
        let description = input.description.or(existing.description);

        conn.execute(
            "UPDATE projects SET customer_id = ?, name = ?, description = ?, updated_at = ? WHERE id = ?",
            (
                customer_id.to_string(),
                &name,
                &description,
                now.to_rfc3339(),
                id.to_string(),
            ),
        )?;

        Ok(Some(Project {
            id,
            customer_id,
            name,
            description,
            created_at: existing.created_at,
            updated_at: now,
        }))
    }

    pub fn delete_project(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM projects WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    pub fn get_project_with_customer(&self, id: Uuid) -> Result<Option<ProjectWithCustomer>> {
        let project = match self.get_project(id)? {
            Some(p) => p,
            None => return Ok(None),
        };

        let customer = self
            .get_customer(project.customer_id)?
            .ok_or_else(|| anyhow::anyhow!("Customer not found"))?;

        Ok(Some(ProjectWithCustomer { project, customer }))
    }

    // ============================================================
    // Feature operations
    // ============================================================

    pub fn get_features_by_project(&self, project_id: Uuid) -> Result<Vec<Feature>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, project_id, title, kind, price, created_at, updated_at
             FROM features WHERE project_id = ? ORDER BY title",
        )?;

        let features = stmt
            .query_map([project_id.to_string()], |row| {
                Ok(Feature {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    project_id: parse_uuid(row.get::<_, String>(1)?),
                    title: row.get(2)?,
                    kind: FeatureKind::from_str(&row.get::<_, String>(3)?)
                        .unwrap_or(FeatureKind::Main),
                    price: row.get(4)?,
                    created_at: parse_datetime(row.get::<_, String>(5)?),
                    updated_at: parse_datetime(row.get::<_, String>(6)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(features)
    }

    pub fn get_features_by_kind(&self, project_id: Uuid, kind: FeatureKind) -> Result<Vec<Feature>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, project_id, title, kind, price, created_at, updated_at
             FROM features WHERE project_id = ? AND kind = ? ORDER BY title",
        )?;

        let features = stmt
            .query_map([project_id.to_string(), kind.as_str().to_string()], |row| {
                Ok(Feature {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    project_id: parse_uuid(row.get::<_, String>(1)?),
                    title: row.get(2)?,
                    kind: FeatureKind::from_str(&row.get::<_, String>(3)?)
                        .unwrap_or(FeatureKind::Main),
                    price: row.get(4)?,
                    created_at: parse_datetime(row.get::<_, String>(5)?),
                    updated_at: parse_datetime(row.get::<_, String>(6)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(features)
    }

    pub fn get_feature(&self, id: Uuid) -> Result<Option<Feature>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, project_id, title, kind, price, created_at, updated_at
             FROM features WHERE id = ?",
        )?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Feature {
                id: parse_uuid(row.get::<_, String>(0)?),
                project_id: parse_uuid(row.get::<_, String>(1)?),
                title: row.get(2)?,
                kind: FeatureKind::from_str(&row.get::<_, String>(3)?)
                    .unwrap_or(FeatureKind::Main),
                price: row.get(4)?,
                created_at: parse_datetime(row.get::<_, String>(5)?),
                updated_at: parse_datetime(row.get::<_, String>(6)?),
            }))
        } else {
            Ok(None)
        }
    }

    pub fn create_feature(&self, project_id: Uuid, input: CreateFeatureInput) -> Result<Feature> {
        // Verify project exists
        self.get_project(project_id)?
            .ok_or_else(|| anyhow::anyhow!("Project not found"))?;

        if input.price < 0 {
            return Err(ValidationError::NegativePrice.into());
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();
        let kind = input.kind.unwrap_or(FeatureKind::Main);

        conn.execute(
            "INSERT INTO features (id, project_id, title, kind, price, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                project_id.to_string(),
                &input.title,
                kind.as_str(),
                input.price,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(Feature {
            id,
            project_id,
            title: input.title,
            kind,
            price: input.price,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update_feature(&self, id: Uuid, input: UpdateFeatureInput) -> Result<Option<Feature>> {
        let Some(existing) = self.get_feature(id)? else {
            return Ok(None);
        };

        let price = input.price.unwrap_or(existing.price);
        if price < 0 {
            return Err(ValidationError::NegativePrice.into());
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();
        let title = input.title.unwrap_or(existing.title);
        let kind = input.kind.unwrap_or(existing.kind);

        conn.execute(
            "UPDATE features SET title = ?, kind = ?, price = ?, updated_at = ? WHERE id = ?",
            (
                &title,
                kind.as_str(),
                price,
                now.to_rfc3339(),
                id.to_string(),
            ),
        )?;

        Ok(Some(Feature {
            id,
            project_id: existing.project_id,
            title,
            kind,
            price,
            created_at: existing.created_at,
            updated_at: now,
        }))
    }

    pub fn delete_feature(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM features WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    /// Features of a project with their tasks attached, grouped in memory
    /// from two queries. This is the shape [`crate::finance`] consumes.
    pub fn get_features_with_tasks(&self, project_id: Uuid) -> Result<Vec<FeatureWithTasks>> {
        let features = self.get_features_by_project(project_id)?;
        let tasks = self.get_tasks_by_project(project_id)?;

        let mut tasks_by_feature: HashMap<Uuid, Vec<Task>> = HashMap::new();
        for task in tasks {
            tasks_by_feature.entry(task.feature_id).or_default().push(task);
        }

        Ok(features
            .into_iter()
            .map(|feature| {
                let tasks = tasks_by_feature.remove(&feature.id).unwrap_or_default();
                FeatureWithTasks { feature, tasks }
            })
            .collect())
    }

    // ============================================================
    // Task operations
    // ============================================================

    pub fn get_task(&self, id: Uuid) -> Result<Option<Task>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, feature_id, title, progress, created_at, updated_at
             FROM tasks WHERE id = ?",
        )?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Task {
                id: parse_uuid(row.get::<_, String>(0)?),
                feature_id: parse_uuid(row.get::<_, String>(1)?),
                title: row.get(2)?,
                progress: row.get(3)?,
                created_at: parse_datetime(row.get::<_, String>(4)?),
                updated_at: parse_datetime(row.get::<_, String>(5)?),
            }))
        } else {
            Ok(None)
        }
    }

    pub fn get_tasks_by_feature(&self, feature_id: Uuid) -> Result<Vec<Task>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, feature_id, title, progress, created_at, updated_at
             FROM tasks WHERE feature_id = ? ORDER BY created_at",
        )?;

        let tasks = stmt
            .query_map([feature_id.to_string()], |row| {
                Ok(Task {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    feature_id: parse_uuid(row.get::<_, String>(1)?),
                    title: row.get(2)?,
                    progress: row.get(3)?,
                    created_at: parse_datetime(row.get::<_, String>(4)?),
                    updated_at: parse_datetime(row.get::<_, String>(5)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(tasks)
    }

    /// Tasks of a project, reached transitively through its features.
    pub fn get_tasks_by_project(&self, project_id: Uuid) -> Result<Vec<Task>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT t.id, t.feature_id, t.title, t.progress, t.created_at, t.updated_at
             FROM tasks t
             JOIN features f ON t.feature_id = f.id
             WHERE f.project_id = ? ORDER BY t.created_at",
        )?;

        let tasks = stmt
            .query_map([project_id.to_string()], |row| {
                Ok(Task {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    feature_id: parse_uuid(row.get::<_, String>(1)?),
                    title: row.get(2)?,
                    progress: row.get(3)?,
                    created_at: parse_datetime(row.get::<_, String>(4)?),
                    updated_at: parse_datetime(row.get::<_, String>(5)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(tasks)
    }

    pub fn create_task(&self, feature_id: Uuid, input: CreateTaskInput) -> Result<Task> {
        // Verify feature exists
        self.get_feature(feature_id)?
            .ok_or_else(|| anyhow::anyhow!("Feature not found"))?;

        let progress = input.progress.unwrap_or(0);
        if progress > 100 {
            return Err(ValidationError::ProgressOutOfRange.into());
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO tasks (id, feature_id, title, progress, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                feature_id.to_string(),
                &input.title,
                progress,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(Task {
            id,
            feature_id,
            title: input.title,
            progress,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update_task(&self, id: Uuid, input: UpdateTaskInput) -> Result<Option<Task>> {
        let Some(existing) = self.get_task(id)? else {
            return Ok(None);
        };

        let progress = input.progress.unwrap_or(existing.progress);
        if progress > 100 {
            return Err(ValidationError::ProgressOutOfRange.into());
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();
        let title = input.title.unwrap_or(existing.title);

        conn.execute(
            "UPDATE tasks SET title = ?, progress = ?, updated_at = ? WHERE id = ?",
            (&title, progress, now.to_rfc3339(), id.to_string()),
        )?;

        Ok(Some(Task {
            id,
            feature_id: existing.feature_id,
            title,
            progress,
            created_at: existing.created_at,
            updated_at: now,
        }))
    }

    pub fn delete_task(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM tasks WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    // ============================================================
    // Payment operations
    // ============================================================

    pub fn get_payment(&self, id: Uuid) -> Result<Option<Payment>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, project_id, direction, amount, description, paid_at, created_at
             FROM payments WHERE id = ?",
        )?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Payment {
                id: parse_uuid(row.get::<_, String>(0)?),
                project_id: parse_uuid(row.get::<_, String>(1)?),
                direction: PaymentDirection::from_str(&row.get::<_, String>(2)?)
                    .unwrap_or(PaymentDirection::In),
                amount: row.get(3)?,
                description: row.get(4)?,
                paid_at: parse_datetime(row.get::<_, String>(5)?),
                created_at: parse_datetime(row.get::<_, String>(6)?),
            }))
        } else {
            Ok(None)
        }
    }

    pub fn get_payments_by_project(&self, project_id: Uuid) -> Result<Vec<Payment>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, project_id, direction, amount, description, paid_at, created_at
             FROM payments WHERE project_id = ? ORDER BY paid_at",
        )?;

        let payments = stmt
            .query_map([project_id.to_string()], |row| {
                Ok(Payment {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    project_id: parse_uuid(row.get::<_, String>(1)?),
                    direction: PaymentDirection::from_str(&row.get::<_, String>(2)?)
                        .unwrap_or(PaymentDirection::In),
                    amount: row.get(3)?,
                    description: row.get(4)?,
                    paid_at: parse_datetime(row.get::<_, String>(5)?),
                    created_at: parse_datetime(row.get::<_, String>(6)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(payments)
    }

    pub fn create_payment(&self, project_id: Uuid, input: CreatePaymentInput) -> Result<Payment> {
        // Verify project exists
        self.get_project(project_id)?
            .ok_or_else(|| anyhow::anyhow!("Project not found"))?;

        if input.amount < 0 {
            return Err(ValidationError::NegativeAmount.into());
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();
        let paid_at = input.paid_at.unwrap_or(now);

        conn.execute(
            "INSERT INTO payments (id, project_id, direction, amount, description, paid_at, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                project_id.to_string(),
                input.direction.as_str(),
                input.amount,
                &input.description,
                paid_at.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(Payment {
            id,
            project_id,
            direction: input.direction,
            amount: input.amount,
            description: input.description,
            paid_at,
            created_at: now,
        })
    }

    pub fn update_payment(&self, id: Uuid, input: UpdatePaymentInput) -> Result<Option<Payment>> {
        let Some(existing) = self.get_payment(id)? else {
            return Ok(None);
        };

        let amount = input.amount.unwrap_or(existing.amount);
        if amount < 0 {
            return Err(ValidationError::NegativeAmount.into());
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let direction = input.direction.unwrap_or(existing.direction);
        let description = input.description.or(existing.description);
        let paid_at = input.paid_at.unwrap_or(existing.paid_at);

        conn.execute(
            "UPDATE payments SET direction = ?, amount = ?, description = ?, paid_at = ? WHERE id = ?",
            (
                direction.as_str(),
                amount,
                &description,
                paid_at.to_rfc3339(),
                id.to_string(),
            ),
        )?;

        Ok(Some(Payment {
            id,
            project_id: existing.project_id,
            direction,
            amount,
            description,
            paid_at,
            created_at: existing.created_at,
        }))
    }

    pub fn delete_payment(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM payments WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    // ============================================================
    // Subscription operations
    // ============================================================

    pub fn get_subscription(&self, id: Uuid) -> Result<Option<Subscription>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, project_id, name, price, billing_interval, started_at, created_at, updated_at
             FROM subscriptions WHERE id = ?",
        )?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Subscription {
                id: parse_uuid(row.get::<_, String>(0)?),
                project_id: parse_uuid(row.get::<_, String>(1)?),
                name: row.get(2)?,
                price: row.get(3)?,
                interval: BillingInterval::from_str(&row.get::<_, String>(4)?)
                    .unwrap_or(BillingInterval::Yearly),
                started_at: parse_datetime(row.get::<_, String>(5)?),
                created_at: parse_datetime(row.get::<_, String>(6)?),
                updated_at: parse_datetime(row.get::<_, String>(7)?),
            }))
        } else {
            Ok(None)
        }
    }

    pub fn get_subscriptions_by_project(&self, project_id: Uuid) -> Result<Vec<Subscription>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, project_id, name, price, billing_interval, started_at, created_at, updated_at
             FROM subscriptions WHERE project_id = ? ORDER BY started_at",
        )?;

        let subscriptions = stmt
            .query_map([project_id.to_string()], |row| {
                Ok(Subscription {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    project_id: parse_uuid(row.get::<_, String>(1)?),
                    name: row.get(2)?,
                    price: row.get(3)?,
                    interval: BillingInterval::from_str(&row.get::<_, String>(4)?)
                        .unwrap_or(BillingInterval::Yearly),
                    started_at: parse_datetime(row.get::<_, String>(5)?),
                    created_at: parse_datetime(row.get::<_, String>(6)?),
                    updated_at: parse_datetime(row.get::<_, String>(7)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(subscriptions)
    }

    pub fn create_subscription(
        &self,
        project_id: Uuid,
        input: CreateSubscriptionInput,
    ) -> Result<Subscription> {
        // Verify project exists
        self.get_project(project_id)?
            .ok_or_else(|| anyhow::anyhow!("Project not found"))?;

        if input.price < 0 {
            return Err(ValidationError::NegativePrice.into());
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();
        let interval = input.interval.unwrap_or(BillingInterval::Yearly);
        let started_at = input.started_at.unwrap_or(now);

        conn.execute(
            "INSERT INTO subscriptions (id, project_id, name, price, billing_interval, started_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                project_id.to_string(),
                &input.name,
                input.price,
                interval.as_str(),
                started_at.to_rfc3339(),
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(Subscription {
            id,
            project_id,
            name: input.name,
            price: input.price,
            interval,
            started_at,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update_subscription(
        &self,
        id: Uuid,
        input: UpdateSubscriptionInput,
    ) -> Result<Option<Subscription>> {
        let Some(existing) = self.get_subscription(id)? else {
            return Ok(None);
        };

        let price = input.price.unwrap_or(existing.price);
        if price < 0 {
            return Err(ValidationError::NegativePrice.into());
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();
        let name = input.name.unwrap_or(existing.name);
        let interval = input.interval.unwrap_or(existing.interval);
        let started_at = input.started_at.unwrap_or(existing.started_at);

        conn.execute(
            "UPDATE subscriptions SET name = ?, price = ?, billing_interval = ?, started_at = ?, updated_at = ? WHERE id = ?",
            (
                &name,
                price,
                interval.as_str(),
                started_at.to_rfc3339(),
                now.to_rfc3339(),
                id.to_string(),
            ),
        )?;

        Ok(Some(Subscription {
            id,
            project_id: existing.project_id,
            name,
            price,
            interval,
            started_at,
            created_at: existing.created_at,
            updated_at: now,
        }))
    }

    pub fn delete_subscription(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM subscriptions WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    // ============================================================
    // Project file operations
    // ============================================================

    pub fn get_project_files(&self, project_id: Uuid) -> Result<Vec<ProjectFile>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, project_id, filename, title, created_at
             FROM project_files WHERE project_id = ? ORDER BY created_at",
        )?;

        let files = stmt
            .query_map([project_id.to_string()], |row| {
                Ok(ProjectFile {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    project_id: parse_uuid(row.get::<_, String>(1)?),
                    filename: row.get(2)?,
                    title: row.get(3)?,
                    created_at: parse_datetime(row.get::<_, String>(4)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(files)
    }

    pub fn add_project_file(&self, project_id: Uuid, input: AddFileInput) -> Result<ProjectFile> {
        // Verify project exists
        self.get_project(project_id)?
            .ok_or_else(|| anyhow::anyhow!("Project not found"))?;

        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO project_files (id, project_id, filename, title, created_at)
             VALUES (?, ?, ?, ?, ?)",
            (
                id.to_string(),
                project_id.to_string(),
                &input.filename,
                &input.title,
                now.to_rfc3339(),
            ),
        )?;

        Ok(ProjectFile {
            id,
            project_id,
            filename: input.filename,
            title: input.title,
            created_at: now,
        })
    }

    pub fn remove_project_file(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM project_files WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    // ============================================================
    // Financial summary
    // ============================================================

    /// Load a project's payments and features-with-tasks and hand them to
    /// the pure aggregation functions. Returns `None` for an unknown
    /// project.
    pub fn get_project_summary(&self, project_id: Uuid) -> Result<Option<ProjectSummary>> {
        if self.get_project(project_id)?.is_none() {
            return Ok(None);
        }

        let payments = self.get_payments_by_project(project_id)?;
        let features = self.get_features_with_tasks(project_id)?;

        Ok(Some(finance::project_summary(&payments, &features)))
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
