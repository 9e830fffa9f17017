use speculate2::speculate;
use tally::db::{Database, ValidationError};
use tally::models::*;
use uuid::Uuid;

fn create_test_customer(db: &Database) -> Customer {
    db.create_customer(CreateCustomerInput {
        name: "Test Customer".to_string(),
        email: None,
        phone: None,
    })
    .expect("Failed to create customer")
}

fn create_test_project(db: &Database) -> Project {
    let customer = create_test_customer(db);
    db.create_project(CreateProjectInput {
        customer_id: customer.id,
        name: "Test Project".to_string(),
        description: None,
    })
    .expect("Failed to create project")
}

/// Create a main feature with one task at the given progress.
fn add_priced_feature(db: &Database, project_id: Uuid, price: i64, progress: u8) -> Feature {
    let feature = db
        .create_feature(
            project_id,
            CreateFeatureInput {
                title: format!("Feature {}", price),
                kind: None,
                price,
            },
        )
        .expect("Failed to create feature");

    db.create_task(
        feature.id,
        CreateTaskInput {
            title: "Task".to_string(),
            progress: Some(progress),
        },
    )
    .expect("Failed to create task");

    feature
}

#[test]
fn open_persists_to_disk() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("tally.db");

    let db = Database::open(path.clone()).expect("Failed to open database");
    db.migrate().expect("Failed to migrate");
    create_test_customer(&db);
    drop(db);

    let reopened = Database::open(path).expect("Failed to reopen database");
    reopened.migrate().expect("Failed to migrate");
    let customers = reopened.get_all_customers().expect("Query failed");
    assert_eq!(customers.len(), 1);
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
    }

    describe "customers" {
        describe "create_customer" {
            it "creates a customer with required fields" {
                let customer = db.create_customer(CreateCustomerInput {
                    name: "Acme Corp".to_string(),
                    email: None,
                    phone: None,
                }).expect("Failed to create customer");

                assert_eq!(customer.name, "Acme Corp");
                assert!(customer.email.is_none());
            }

            it "creates a customer with all fields" {
                let customer = db.create_customer(CreateCustomerInput {
                    name: "Acme Corp".to_string(),
                    email: Some("billing@acme.test".to_string()),
                    phone: Some("+1 555 0100".to_string()),
                }).expect("Failed to create customer");

                assert_eq!(customer.email, Some("billing@acme.test".to_string()));
                assert_eq!(customer.phone, Some("+1 555 0100".to_string()));
            }
        }

        describe "get_customer" {
            it "returns None for non-existent customer" {
                let result = db.get_customer(Uuid::new_v4()).expect("Query failed");
                assert!(result.is_none());
            }

            it "returns the customer by id" {
                let created = create_test_customer(&db);

                let found = db.get_customer(created.id).expect("Query failed");
                assert!(found.is_some());
                assert_eq!(found.unwrap().name, "Test Customer");
            }
        }

        describe "get_all_customers" {
            it "returns all customers ordered by name" {
                db.create_customer(CreateCustomerInput {
                    name: "Zebra Ltd".to_string(),
                    email: None,
                    phone: None,
                }).expect("Failed to create");

                db.create_customer(CreateCustomerInput {
                    name: "Alpha GmbH".to_string(),
                    email: None,
                    phone: None,
                }).expect("Failed to create");

                let customers = db.get_all_customers().expect("Query failed");
                assert_eq!(customers.len(), 2);
                assert_eq!(customers[0].name, "Alpha GmbH");
                assert_eq!(customers[1].name, "Zebra Ltd");
            }
        }

        describe "update_customer" {
            it "merges partial updates over the existing row" {
                let customer = create_test_customer(&db);

                let updated = db.update_customer(customer.id, UpdateCustomerInput {
                    name: None,
                    email: Some("new@acme.test".to_string()),
                    phone: None,
                }).expect("Update failed").expect("Customer missing");

                assert_eq!(updated.name, "Test Customer");
                assert_eq!(updated.email, Some("new@acme.test".to_string()));
            }
        }

        describe "delete_customer" {
            it "deletes the customer and cascades to projects" {
                let project = create_test_project(&db);

                db.delete_customer(project.customer_id).expect("Failed to delete");

                assert!(db.get_project(project.id).expect("Query failed").is_none());
            }
        }
    }

    describe "projects" {
        describe "create_project" {
            it "creates a project for an existing customer" {
                let customer = create_test_customer(&db);

                let project = db.create_project(CreateProjectInput {
                    customer_id: customer.id,
                    name: "Website Relaunch".to_string(),
                    description: Some("Full redesign".to_string()),
                }).expect("Failed to create project");

                assert_eq!(project.customer_id, customer.id);
                assert_eq!(project.name, "Website Relaunch");
            }

            it "rejects a project for an unknown customer" {
                let result = db.create_project(CreateProjectInput {
                    customer_id: Uuid::new_v4(),
                    name: "Orphan".to_string(),
                    description: None,
                });

                assert!(result.is_err());
            }
        }

        describe "get_project_with_customer" {
            it "returns the project together with its customer" {
                let project = create_test_project(&db);

                let detailed = db.get_project_with_customer(project.id)
                    .expect("Query failed")
                    .expect("Project missing");

                assert_eq!(detailed.project.id, project.id);
                assert_eq!(detailed.customer.id, project.customer_id);
            }

            it "returns None for non-existent project" {
                let result = db.get_project_with_customer(Uuid::new_v4()).expect("Query failed");
                assert!(result.is_none());
            }
        }

        describe "get_projects_by_customer" {
            it "returns only that customer's projects" {
                let project = create_test_project(&db);
                create_test_project(&db); // belongs to a different customer

                let projects = db.get_projects_by_customer(project.customer_id).expect("Query failed");
                assert_eq!(projects.len(), 1);
                assert_eq!(projects[0].id, project.id);
            }
        }

        describe "delete_project" {
            it "deletes the project and cascades to features and payments" {
                let project = create_test_project(&db);

                let feature = db.create_feature(project.id, CreateFeatureInput {
                    title: "Feature".to_string(),
                    kind: None,
                    price: 1000,
                }).expect("Failed to create feature");

                db.create_payment(project.id, CreatePaymentInput {
                    direction: PaymentDirection::In,
                    amount: 5000,
                    description: None,
                    paid_at: None,
                }).expect("Failed to create payment");

                db.delete_project(project.id).expect("Failed to delete");

                assert!(db.get_feature(feature.id).expect("Query failed").is_none());
                let features = db.get_features_by_project(project.id).expect("Query failed");
                assert!(features.is_empty());
                let payments = db.get_payments_by_project(project.id).expect("Query failed");
                assert!(payments.is_empty());
            }
        }
    }

    describe "features" {
        describe "create_feature" {
            it "defaults to a free main feature" {
                let project = create_test_project(&db);

                let feature = db.create_feature(project.id, CreateFeatureInput {
                    title: "Login".to_string(),
                    kind: None,
                    price: 0,
                }).expect("Failed to create feature");

                assert_eq!(feature.kind, FeatureKind::Main);
                assert_eq!(feature.price, 0);
            }

            it "rejects a negative price" {
                let project = create_test_project(&db);

                let err = db.create_feature(project.id, CreateFeatureInput {
                    title: "Broken".to_string(),
                    kind: None,
                    price: -100,
                }).expect_err("Negative price must be rejected");

                assert!(err.downcast_ref::<ValidationError>().is_some());
            }

            it "rejects a feature for an unknown project" {
                let result = db.create_feature(Uuid::new_v4(), CreateFeatureInput {
                    title: "Orphan".to_string(),
                    kind: None,
                    price: 0,
                });

                assert!(result.is_err());
            }
        }

        describe "get_features_by_kind" {
            it "partitions main and additional features" {
                let project = create_test_project(&db);

                db.create_feature(project.id, CreateFeatureInput {
                    title: "Core".to_string(),
                    kind: Some(FeatureKind::Main),
                    price: 2000,
                }).expect("Failed to create");

                db.create_feature(project.id, CreateFeatureInput {
                    title: "Extra".to_string(),
                    kind: Some(FeatureKind::Additional),
                    price: 500,
                }).expect("Failed to create");

                let main = db.get_features_by_kind(project.id, FeatureKind::Main).expect("Query failed");
                assert_eq!(main.len(), 1);
                assert_eq!(main[0].title, "Core");

                let additional = db.get_features_by_kind(project.id, FeatureKind::Additional).expect("Query failed");
                assert_eq!(additional.len(), 1);
                assert_eq!(additional[0].title, "Extra");

                let all = db.get_features_by_project(project.id).expect("Query failed");
                assert_eq!(all.len(), 2);
            }
        }

        describe "update_feature" {
            it "updates price and kind" {
                let project = create_test_project(&db);
                let feature = db.create_feature(project.id, CreateFeatureInput {
                    title: "Login".to_string(),
                    kind: None,
                    price: 1000,
                }).expect("Failed to create");

                let updated = db.update_feature(feature.id, UpdateFeatureInput {
                    title: None,
                    kind: Some(FeatureKind::Additional),
                    price: Some(2500),
                }).expect("Update failed").expect("Feature missing");

                assert_eq!(updated.title, "Login");
                assert_eq!(updated.kind, FeatureKind::Additional);
                assert_eq!(updated.price, 2500);
            }

            it "rejects a negative price" {
                let project = create_test_project(&db);
                let feature = db.create_feature(project.id, CreateFeatureInput {
                    title: "Login".to_string(),
                    kind: None,
                    price: 1000,
                }).expect("Failed to create");

                let result = db.update_feature(feature.id, UpdateFeatureInput {
                    title: None,
                    kind: None,
                    price: Some(-1),
                });

                assert!(result.is_err());
            }
        }
    }

    describe "tasks" {
        describe "create_task" {
            it "creates a task with an initial progress" {
                let project = create_test_project(&db);
                let feature = db.create_feature(project.id, CreateFeatureInput {
                    title: "Login".to_string(),
                    kind: None,
                    price: 1000,
                }).expect("Failed to create feature");

                let task = db.create_task(feature.id, CreateTaskInput {
                    title: "Wire up form".to_string(),
                    progress: Some(40),
                }).expect("Failed to create task");

                assert_eq!(task.feature_id, feature.id);
                assert_eq!(task.progress, 40);
            }

            it "defaults progress to 0" {
                let project = create_test_project(&db);
                let feature = db.create_feature(project.id, CreateFeatureInput {
                    title: "Login".to_string(),
                    kind: None,
                    price: 1000,
                }).expect("Failed to create feature");

                let task = db.create_task(feature.id, CreateTaskInput {
                    title: "Wire up form".to_string(),
                    progress: None,
                }).expect("Failed to create task");

                assert_eq!(task.progress, 0);
            }

            it "rejects progress above 100" {
                let project = create_test_project(&db);
                let feature = db.create_feature(project.id, CreateFeatureInput {
                    title: "Login".to_string(),
                    kind: None,
                    price: 1000,
                }).expect("Failed to create feature");

                let err = db.create_task(feature.id, CreateTaskInput {
                    title: "Overshoot".to_string(),
                    progress: Some(150),
                }).expect_err("Out-of-range progress must be rejected");

                assert!(err.downcast_ref::<ValidationError>().is_some());
            }
        }

        describe "update_task" {
            it "rejects progress above 100" {
                let project = create_test_project(&db);
                let feature = db.create_feature(project.id, CreateFeatureInput {
                    title: "Login".to_string(),
                    kind: None,
                    price: 1000,
                }).expect("Failed to create feature");
                let task = db.create_task(feature.id, CreateTaskInput {
                    title: "Task".to_string(),
                    progress: Some(10),
                }).expect("Failed to create task");

                let result = db.update_task(task.id, UpdateTaskInput {
                    title: None,
                    progress: Some(101),
                });

                assert!(result.is_err());
            }

            it "moves progress forward" {
                let project = create_test_project(&db);
                let feature = db.create_feature(project.id, CreateFeatureInput {
                    title: "Login".to_string(),
                    kind: None,
                    price: 1000,
                }).expect("Failed to create feature");
                let task = db.create_task(feature.id, CreateTaskInput {
                    title: "Task".to_string(),
                    progress: Some(10),
                }).expect("Failed to create task");

                let updated = db.update_task(task.id, UpdateTaskInput {
                    title: None,
                    progress: Some(75),
                }).expect("Update failed").expect("Task missing");

                assert_eq!(updated.progress, 75);
            }
        }

        describe "get_tasks_by_project" {
            it "reaches tasks transitively through features" {
                let project = create_test_project(&db);

                let first = db.create_feature(project.id, CreateFeatureInput {
                    title: "Login".to_string(),
                    kind: None,
                    price: 1000,
                }).expect("Failed to create feature");
                let second = db.create_feature(project.id, CreateFeatureInput {
                    title: "Search".to_string(),
                    kind: Some(FeatureKind::Additional),
                    price: 500,
                }).expect("Failed to create feature");

                db.create_task(first.id, CreateTaskInput {
                    title: "A".to_string(),
                    progress: None,
                }).expect("Failed to create task");
                db.create_task(second.id, CreateTaskInput {
                    title: "B".to_string(),
                    progress: None,
                }).expect("Failed to create task");

                let tasks = db.get_tasks_by_project(project.id).expect("Query failed");
                assert_eq!(tasks.len(), 2);
            }

            it "does not include tasks from other projects" {
                let project = create_test_project(&db);
                let other = create_test_project(&db);

                let feature = db.create_feature(other.id, CreateFeatureInput {
                    title: "Elsewhere".to_string(),
                    kind: None,
                    price: 0,
                }).expect("Failed to create feature");
                db.create_task(feature.id, CreateTaskInput {
                    title: "Other".to_string(),
                    progress: None,
                }).expect("Failed to create task");

                let tasks = db.get_tasks_by_project(project.id).expect("Query failed");
                assert!(tasks.is_empty());
            }
        }
    }

    describe "payments" {
        describe "create_payment" {
            it "records an incoming payment" {
                let project = create_test_project(&db);

                let payment = db.create_payment(project.id, CreatePaymentInput {
                    direction: PaymentDirection::In,
                    amount: 20000,
                    description: Some("Deposit".to_string()),
                    paid_at: None,
                }).expect("Failed to create payment");

                assert_eq!(payment.project_id, project.id);
                assert_eq!(payment.direction, PaymentDirection::In);
                assert_eq!(payment.amount, 20000);
            }

            it "rejects a negative amount" {
                let project = create_test_project(&db);

                let err = db.create_payment(project.id, CreatePaymentInput {
                    direction: PaymentDirection::Out,
                    amount: -500,
                    description: None,
                    paid_at: None,
                }).expect_err("Negative amount must be rejected");

                assert!(err.downcast_ref::<ValidationError>().is_some());
            }
        }

        describe "get_payments_by_project" {
            it "returns only that project's payments" {
                let project = create_test_project(&db);
                let other = create_test_project(&db);

                db.create_payment(project.id, CreatePaymentInput {
                    direction: PaymentDirection::In,
                    amount: 100,
                    description: None,
                    paid_at: None,
                }).expect("Failed to create payment");
                db.create_payment(other.id, CreatePaymentInput {
                    direction: PaymentDirection::In,
                    amount: 999,
                    description: None,
                    paid_at: None,
                }).expect("Failed to create payment");

                let payments = db.get_payments_by_project(project.id).expect("Query failed");
                assert_eq!(payments.len(), 1);
                assert_eq!(payments[0].amount, 100);
            }
        }
    }

    describe "subscriptions" {
        it "creates a subscription with defaults" {
            let project = create_test_project(&db);

            let subscription = db.create_subscription(project.id, CreateSubscriptionInput {
                name: "example.com".to_string(),
                price: 1200,
                interval: None,
                started_at: None,
            }).expect("Failed to create subscription");

            assert_eq!(subscription.interval, BillingInterval::Yearly);
            assert_eq!(subscription.price, 1200);
        }

        it "lists a project's subscriptions" {
            let project = create_test_project(&db);

            db.create_subscription(project.id, CreateSubscriptionInput {
                name: "example.com".to_string(),
                price: 1200,
                interval: None,
                started_at: None,
            }).expect("Failed to create subscription");
            db.create_subscription(project.id, CreateSubscriptionInput {
                name: "Hosting".to_string(),
                price: 900,
                interval: Some(BillingInterval::Monthly),
                started_at: None,
            }).expect("Failed to create subscription");

            let subscriptions = db.get_subscriptions_by_project(project.id).expect("Query failed");
            assert_eq!(subscriptions.len(), 2);
        }
    }

    describe "project_files" {
        it "attaches and removes files" {
            let project = create_test_project(&db);

            let file = db.add_project_file(project.id, AddFileInput {
                filename: "contract.pdf".to_string(),
                title: Some("Signed contract".to_string()),
            }).expect("Failed to add file");

            let files = db.get_project_files(project.id).expect("Query failed");
            assert_eq!(files.len(), 1);
            assert_eq!(files[0].filename, "contract.pdf");

            assert!(db.remove_project_file(file.id).expect("Remove failed"));
            let files = db.get_project_files(project.id).expect("Query failed");
            assert!(files.is_empty());
        }
    }

    describe "project_summary" {
        it "sums incoming payments into cash_in_total" {
            let project = create_test_project(&db);

            for _ in 0..2 {
                db.create_payment(project.id, CreatePaymentInput {
                    direction: PaymentDirection::In,
                    amount: 20000,
                    description: None,
                    paid_at: None,
                }).expect("Failed to create payment");
            }

            let summary = db.get_project_summary(project.id)
                .expect("Query failed")
                .expect("Project missing");

            assert_eq!(summary.cash_in_total, 40000);
            assert_eq!(summary.cash_out_total, 0);
        }

        it "keeps outgoing payments out of cash_in_total" {
            let project = create_test_project(&db);

            for _ in 0..2 {
                db.create_payment(project.id, CreatePaymentInput {
                    direction: PaymentDirection::Out,
                    amount: 10000,
                    description: None,
                    paid_at: None,
                }).expect("Failed to create payment");
            }
            db.create_payment(project.id, CreatePaymentInput {
                direction: PaymentDirection::In,
                amount: 10000,
                description: None,
                paid_at: None,
            }).expect("Failed to create payment");

            let summary = db.get_project_summary(project.id)
                .expect("Query failed")
                .expect("Project missing");

            assert_eq!(summary.cash_out_total, 20000);
            assert_eq!(summary.cash_in_total, 10000);
        }

        it "weights feature progress by price" {
            let project = create_test_project(&db);

            add_priced_feature(&db, project.id, 2000, 20);
            add_priced_feature(&db, project.id, 3000, 30);
            add_priced_feature(&db, project.id, 1500, 100);
            add_priced_feature(&db, project.id, 1500, 100);

            let summary = db.get_project_summary(project.id)
                .expect("Query failed")
                .expect("Project missing");

            assert_eq!(summary.feature_overall_progress, 53.75);
            // 400 + 900 + 1500 + 1500
            assert_eq!(summary.collectible_earnings, 4300.0);
        }

        it "reports 0 progress when every main feature is free" {
            let project = create_test_project(&db);

            for _ in 0..4 {
                add_priced_feature(&db, project.id, 0, 100);
            }

            let summary = db.get_project_summary(project.id)
                .expect("Query failed")
                .expect("Project missing");

            assert_eq!(summary.feature_overall_progress, 0.0);
        }

        it "ignores additional features in progress and earnings" {
            let project = create_test_project(&db);

            add_priced_feature(&db, project.id, 2000, 20);
            add_priced_feature(&db, project.id, 3000, 30);

            let before = db.get_project_summary(project.id)
                .expect("Query failed")
                .expect("Project missing");

            let extra = db.create_feature(project.id, CreateFeatureInput {
                title: "Add-on".to_string(),
                kind: Some(FeatureKind::Additional),
                price: 9000,
            }).expect("Failed to create feature");
            db.create_task(extra.id, CreateTaskInput {
                title: "Done".to_string(),
                progress: Some(100),
            }).expect("Failed to create task");

            let after = db.get_project_summary(project.id)
                .expect("Query failed")
                .expect("Project missing");

            assert_eq!(after.feature_overall_progress, before.feature_overall_progress);
            assert_eq!(after.collectible_earnings, before.collectible_earnings);
        }

        it "returns None for a non-existent project" {
            let result = db.get_project_summary(Uuid::new_v4()).expect("Query failed");
            assert!(result.is_none());
        }
    }
}
