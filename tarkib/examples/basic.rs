//! Basic example of the Tarkib service-resolution container.

use std::sync::Arc;
use tarkib::prelude::*;

trait Logger: Send + Sync {
    fn log(&self, msg: &str);
}

struct ConsoleLogger;

impl Logger for ConsoleLogger {
    fn log(&self, msg: &str) {
        println!("log: {msg}");
    }
}

struct Config {
    database_url: String,
}

struct Database {
    url: String,
    logger: Svc<dyn Logger>,
}

impl Database {
    fn query(&self, sql: &str) -> String {
        self.logger.log(&format!("query on {}: {sql}", self.url));
        format!("rows from {}", self.url)
    }
}

struct UserService {
    db: Svc<Database>,
    logger: Svc<dyn Logger>,
}

impl UserService {
    fn get_user(&self, id: u64) -> String {
        self.logger.log(&format!("looking up user {id}"));
        self.db
            .query(&format!("SELECT * FROM users WHERE id = {id}"))
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("tarkib=debug")
        .init();

    let container = Container::new();

    // Describe the types the resolver may construct.
    container.declare_interface::<dyn Logger>();
    container.describe_class(
        ClassInfo::<ConsoleLogger>::new()
            .constructor(|| ConsoleLogger)
            .implements::<dyn Logger>(|l| l),
    );
    container.describe_class(ClassInfo::<Database>::new().constructor(
        |config: Svc<Config>, logger: Svc<dyn Logger>| Database {
            url: config.database_url.clone(),
            logger,
        },
    ));
    container.describe_class(ClassInfo::<UserService>::new().constructor(
        |db: Svc<Database>, logger: Svc<dyn Logger>| UserService { db, logger },
    ));

    // Config — pre-built singleton value
    container.add_singleton(Arc::new(Config {
        database_url: "postgres://localhost/appdb".to_string(),
    }))?;
    // Logger — singleton, constructed on first use
    container.add_type_map::<dyn Logger, ConsoleLogger>(Lifetime::Singleton)?;
    // Database — singleton (depends on Config + Logger)
    container.add_type_map::<Database, Database>(Lifetime::Singleton)?;
    // UserService — transient (new each time)
    container.add_type_map::<UserService, UserService>(Lifetime::Transient)?;

    println!("container ready: {container:?}");

    let service: Svc<UserService> = container.resolve()?;
    println!("{}", service.get_user(42));

    // Resolve again — a fresh UserService sharing the same Database.
    let service2: Svc<UserService> = container.resolve()?;
    println!("{}", service2.get_user(7));
    assert!(Svc::ptr_eq(&service.db, &service2.db));

    container.clear();
    Ok(())
}
