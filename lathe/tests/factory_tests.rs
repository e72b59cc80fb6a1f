use lathe::{
    Association, AttributeValue, BackendAdapter, DocumentAdapter, Entity, EntityId, EntitySchema,
    EntityStore, Factory, FactoryConfig, FieldDef, GeneratorRegistry, LatheError, MemoryStore,
    SchemaCatalog, Scope, SqliteStore, StorageError, StorageResult, generator,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing_subscriber::EnvFilter;

/// Routes construction logs to the test harness; `RUST_LOG=lathe=debug`
/// shows them.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn catalog() -> SchemaCatalog {
    SchemaCatalog::new()
        .with(
            EntitySchema::new("Person")
                .field(FieldDef::text("name"))
                .field(FieldDef::text("email"))
                .field(FieldDef::text("password"))
                .field(FieldDef::bool("admin").with_default(false)),
        )
        .with(
            EntitySchema::new("Admin")
                .extends("Person")
                .field(FieldDef::bool("admin").with_default(true)),
        )
        .with(
            EntitySchema::new("Post")
                .field(FieldDef::text("title"))
                .field(FieldDef::text("body"))
                .association(Association::belongs_to("author").with_class_name("Person"))
                .has_many("comments"),
        )
        .with(
            EntitySchema::new("Comment")
                .field(FieldDef::text("body"))
                .belongs_to("post")
                .association(Association::belongs_to("author").with_class_name("Person")),
        )
        .with(EntitySchema::new("Tag").field(FieldDef::text("label")))
        .with(
            EntitySchema::new("Node")
                .association(Association::belongs_to("parent").with_class_name("Node")),
        )
}

fn email_from_name(scope: &mut Scope<'_>) -> lathe::LatheResult<String> {
    scope
        .get_str("name")
        .map(|name| format!("{}@example.com", name.to_lowercase().replace(' ', ".")))
        .ok_or_else(|| scope.fail("name is not assigned yet"))
}

/// Registers the blog blueprints on a factory with private generators.
fn install_blueprints(factory: &Factory) {
    init_tracing();
    factory
        .generators()
        .define("name", generator::sequence("Person {n}"))
        .unwrap();

    factory
        .blueprint("Person", |b| {
            b.reference("name")
                .attribute("email", email_from_name)
                .value("password", "secret");
        })
        .unwrap();
    factory
        .named_blueprint("Person", "fixed_id", |b| {
            b.value("id", "person-42");
        })
        .unwrap();

    factory
        .blueprint("Post", |b| {
            b.sequence("title", "post_title", "Post {n}")
                .value("body", "Lorem ipsum")
                .reference("author");
        })
        .unwrap();
    factory
        .named_blueprint("Post", "dummy", |b| {
            b.value("title", "Dummy post");
        })
        .unwrap();

    factory
        .blueprint("Comment", |b| {
            b.value("body", "Nice post").reference("post").reference("author");
        })
        .unwrap();
    factory
        .named_blueprint("Comment", "no_post", |b| {
            b.value("post", AttributeValue::NULL);
        })
        .unwrap();
    factory
        .named_blueprint("Comment", "on_dummy", |b| {
            b.association("post", "dummy");
        })
        .unwrap();

    factory
        .named_blueprint("Tag", "sale", |b| {
            b.value("label", "sale");
        })
        .unwrap();
}

fn blog() -> Factory {
    let factory =
        Factory::document(catalog()).with_generators(Arc::new(GeneratorRegistry::new()));
    install_blueprints(&factory);
    factory
}

fn count(factory: &Factory, entity_type: &str) -> usize {
    factory.store().count(entity_type).unwrap()
}

// ── make ─────────────────────────────────────────────────────────

#[test]
fn make_saves_object_and_associations() {
    let factory = blog();
    let comment = factory.make("Comment").unwrap();

    assert!(comment.persisted);
    let post = comment.get_entity("post").unwrap();
    assert!(post.persisted);
    assert_eq!(post.entity_type, "Post");
    assert_eq!(count(&factory, "Comment"), 1);
    assert_eq!(count(&factory, "Post"), 1);
    assert_eq!(count(&factory, "Person"), 2);
}

#[test]
fn attributes_are_assigned_in_declaration_order() {
    let factory = blog();
    let person = factory.make("Person").unwrap();
    assert_eq!(person.get_str("name"), Some("Person 1"));
    assert_eq!(person.get_str("email"), Some("person.1@example.com"));
    assert_eq!(person.get_str("password"), Some("secret"));
}

#[test]
fn schema_defaults_apply_before_blueprint() {
    let factory = blog();
    let person = factory.make("Person").unwrap();
    assert_eq!(person.get_bool("admin"), Some(false));
}

#[test]
fn stored_copy_matches_built_object() {
    let factory = blog();
    let post = factory.make("Post").unwrap();
    let stored = factory.store().get(&post.id).unwrap().unwrap();
    assert_eq!(stored.get_str("title"), post.get_str("title"));
    assert_eq!(
        stored.get_str("author"),
        Some(post.get_entity("author").unwrap().id.as_str())
    );
}

#[test]
fn subtype_uses_parent_blueprint() {
    let factory = blog();
    let admin = factory.make("Admin").unwrap();

    assert_eq!(admin.entity_type, "Admin");
    assert_eq!(admin.get_str("name"), Some("Person 1"));
    assert_eq!(admin.get_bool("admin"), Some(true));
    assert_eq!(count(&factory, "Admin"), 1);
    assert_eq!(count(&factory, "Person"), 0);
}

#[test]
fn subtype_blueprint_wins_over_parent() {
    let factory = blog();
    factory
        .blueprint("Admin", |b| {
            b.value("name", "Root");
        })
        .unwrap();
    let admin = factory.make("Admin").unwrap();
    assert_eq!(admin.get_str("name"), Some("Root"));
    assert_eq!(admin.get("email"), None);
}

#[test]
fn belongs_to_builds_class_name_type() {
    let factory = blog();
    let post = factory.make("Post").unwrap();
    let author = post.get_entity("author").unwrap();
    assert_eq!(author.entity_type, "Person");
    assert!(author.persisted);
}

#[test]
fn blueprint_can_set_id() {
    let factory = blog();
    let person = factory.construct("Person").named("fixed_id").make().unwrap();

    assert_eq!(person.id.as_str(), "person-42");
    let stored = factory
        .store()
        .get(&EntityId::parse("person-42").unwrap())
        .unwrap();
    assert!(stored.is_some());
}

#[test]
fn make_many_builds_distinct_objects() {
    let factory = blog();
    let people = factory.make_many("Person", 5).unwrap();
    let names: HashSet<_> = people
        .iter()
        .map(|p| p.get_str("name").unwrap().to_string())
        .collect();
    assert_eq!(names.len(), 5);
    assert_eq!(count(&factory, "Person"), 5);
}

proptest! {
    #[test]
    fn generated_values_unique_across_constructions(n in 1usize..30) {
        let factory = blog();
        let posts = factory.make_many("Post", n).unwrap();
        let titles: HashSet<_> = posts.iter().filter_map(|p| p.get_str("title")).collect();
        let emails: HashSet<_> = posts
            .iter()
            .filter_map(|p| p.get_entity("author")?.get_str("email"))
            .collect();
        prop_assert_eq!(titles.len(), n);
        prop_assert_eq!(emails.len(), n);
    }
}

#[test]
fn make_then_sees_saved_object() {
    let factory = blog();
    let post = factory
        .construct("Post")
        .make_then(|post: &mut Entity| {
            assert!(post.persisted);
            post.assign("title", "Edited");
            Ok(())
        })
        .unwrap();
    assert_eq!(post.get_str("title"), Some("Edited"));
}

// ── Named blueprints ─────────────────────────────────────────────

#[test]
fn named_blueprint_layers_over_default() {
    let factory = blog();
    let post = factory.construct("Post").named("dummy").make().unwrap();

    assert_eq!(post.get_str("title"), Some("Dummy post"));
    assert_eq!(post.get_str("body"), Some("Lorem ipsum"));
    assert!(post.get_entity("author").is_some());
}

#[test]
fn named_blueprint_skips_default_generator() {
    let factory = blog();
    factory.construct("Post").named("dummy").make().unwrap();
    let post = factory.make("Post").unwrap();
    assert_eq!(post.get_str("title"), Some("Post 1"));
}

#[test]
fn named_blueprint_without_default() {
    let factory = blog();
    let tag = factory.construct("Tag").named("sale").make().unwrap();
    assert_eq!(tag.get_str("label"), Some("sale"));

    let err = factory.make("Tag").unwrap_err();
    assert!(matches!(err, LatheError::NoBlueprintFound { ref entity_type, .. } if entity_type == "Tag"));
}

#[test]
fn association_uses_named_blueprint() {
    let factory = blog();
    let comment = factory.construct("Comment").named("on_dummy").make().unwrap();
    let post = comment.get_entity("post").unwrap();
    assert_eq!(post.get_str("title"), Some("Dummy post"));
    assert_eq!(post.get_str("body"), Some("Lorem ipsum"));
}

#[test]
fn null_association_builds_nothing() {
    let factory = blog();
    let comment = factory.construct("Comment").named("no_post").make().unwrap();

    assert!(comment.get("post").unwrap().is_null());
    assert_eq!(count(&factory, "Post"), 0);
    assert_eq!(count(&factory, "Person"), 1);
}

#[test]
fn missing_named_blueprint_is_an_error() {
    let factory = blog();
    let err = factory.construct("Post").named("nope").make().unwrap_err();
    assert_eq!(err.to_string(), "no blueprint :nope for Post");
}

#[test]
fn redefining_replaces_blueprint() {
    let factory = blog();
    factory
        .blueprint("Tag", |b| {
            b.value("label", "first");
        })
        .unwrap();
    factory
        .blueprint("Tag", |b| {
            b.value("label", "second");
        })
        .unwrap();
    assert_eq!(factory.make("Tag").unwrap().get_str("label"), Some("second"));
}

#[test]
fn cleared_type_has_no_blueprints() {
    let factory = blog();
    factory.clear_blueprints("Post").unwrap();
    assert!(matches!(
        factory.make("Post"),
        Err(LatheError::NoBlueprintFound { .. })
    ));
    assert!(factory.make("Person").is_ok());
}

// ── Overrides ────────────────────────────────────────────────────

#[test]
fn override_replaces_blueprint_value() {
    let factory = blog();
    let person = factory
        .construct("Person")
        .with("password", "hunter2")
        .make()
        .unwrap();
    assert_eq!(person.get_str("password"), Some("hunter2"));
}

#[test]
fn override_is_visible_to_later_attributes() {
    let factory = blog();
    let person = factory.construct("Person").with("name", "Ada").make().unwrap();
    assert_eq!(person.get_str("email"), Some("ada@example.com"));
}

#[test]
fn override_does_not_advance_generator() {
    let factory = blog();
    factory.construct("Person").with("name", "Ada").make().unwrap();
    let person = factory.make("Person").unwrap();
    assert_eq!(person.get_str("name"), Some("Person 1"));
}

#[test]
fn override_skips_nested_construction() {
    let factory = blog();
    let post = factory.make("Post").unwrap();
    let comment = factory
        .construct("Comment")
        .with("post", post.clone())
        .make()
        .unwrap();

    assert_eq!(comment.get_entity("post").unwrap().id, post.id);
    assert_eq!(count(&factory, "Post"), 1);
}

#[test]
fn unmentioned_override_is_assigned() {
    let factory = blog();
    let tag = factory
        .construct("Tag")
        .named("sale")
        .with("color", "red")
        .make()
        .unwrap();
    assert_eq!(tag.get_str("color"), Some("red"));
}

// ── Scope ────────────────────────────────────────────────────────

#[test]
fn scope_reads_only_earlier_attributes() {
    let factory = blog();
    factory
        .named_blueprint("Person", "peek", |b| {
            b.attribute("saw_late", |s: &mut Scope<'_>| Ok(s.get("late").is_some()))
                .value("late", "x")
                .attribute("saw_early", |s: &mut Scope<'_>| {
                    Ok(s.get("saw_late").is_some())
                });
        })
        .unwrap();
    let person = factory.construct("Person").named("peek").make().unwrap();
    assert_eq!(person.get_bool("saw_late"), Some(false));
    assert_eq!(person.get_bool("saw_early"), Some(true));
}

#[test]
fn scope_make_named_builds_with_blueprint() {
    let factory = blog();
    factory
        .named_blueprint("Comment", "scoped", |b| {
            b.attribute("post", |s: &mut Scope<'_>| s.make_named("Post", "dummy"));
        })
        .unwrap();
    let comment = factory.construct("Comment").named("scoped").make().unwrap();
    assert_eq!(
        comment.get_entity("post").unwrap().get_str("title"),
        Some("Dummy post")
    );
}

#[test]
fn scope_make_unsaved_skips_store() {
    let factory = blog();
    factory
        .named_blueprint("Post", "draft_author", |b| {
            b.attribute("author", |s: &mut Scope<'_>| s.make_unsaved("Person"));
        })
        .unwrap();
    let post = factory.construct("Post").named("draft_author").make().unwrap();

    assert!(post.persisted);
    assert!(!post.get_entity("author").unwrap().persisted);
    assert_eq!(count(&factory, "Person"), 0);
}

#[test]
fn scope_sham_draws_defined_generator() {
    let factory = blog();
    factory
        .named_blueprint("Person", "alias", |b| {
            b.attribute("nickname", |s: &mut Scope<'_>| s.sham("name"));
        })
        .unwrap();
    let person = factory.construct("Person").named("alias").make().unwrap();
    assert_eq!(person.get_str("nickname"), Some("Person 1"));
    assert_eq!(person.get_str("name"), Some("Person 2"));
}

#[test]
fn scope_plan_saves_only_nested() {
    let factory = blog();
    factory
        .named_blueprint("Tag", "planned", |b| {
            b.attribute("label", |s: &mut Scope<'_>| {
                let plan = s.plan("Post")?;
                Ok(plan.get("title").and_then(AttributeValue::as_str).map(String::from))
            });
        })
        .unwrap();
    let tag = factory.construct("Tag").named("planned").make().unwrap();
    assert_eq!(tag.get_str("label"), Some("Post 1"));
    assert_eq!(count(&factory, "Post"), 0);
    assert_eq!(count(&factory, "Person"), 1);
}

#[test]
fn producer_failure_propagates() {
    let factory = blog();
    factory
        .named_blueprint("Tag", "broken", |b| {
            b.attribute("label", |s: &mut Scope<'_>| -> lathe::LatheResult<String> {
                Err(s.fail("no labels left"))
            });
        })
        .unwrap();
    let err = factory.construct("Tag").named("broken").make().unwrap_err();
    assert_eq!(
        err.to_string(),
        "producer for \"label\" failed: no labels left"
    );
    assert_eq!(count(&factory, "Tag"), 0);
}

// ── Bare references ──────────────────────────────────────────────

#[test]
fn bare_reference_without_generator_fails() {
    let factory = blog();
    factory
        .named_blueprint("Person", "mystery", |b| {
            b.reference("nickname");
        })
        .unwrap();
    let err = factory.construct("Person").named("mystery").make().unwrap_err();
    assert!(matches!(err, LatheError::NoGenerator(ref name) if name == "nickname"));
}

#[test]
fn named_association_on_plain_field_fails() {
    let factory = blog();
    factory
        .named_blueprint("Person", "bad", |b| {
            b.association("email", "dummy");
        })
        .unwrap();
    let err = factory.construct("Person").named("bad").make().unwrap_err();
    assert!(matches!(
        err,
        LatheError::UnknownAssociation { ref attribute, .. } if attribute == "email"
    ));
}

#[test]
fn self_referencing_blueprint_hits_depth_limit() {
    let factory = Factory::document(catalog())
        .with_generators(Arc::new(GeneratorRegistry::new()))
        .with_config(FactoryConfig {
            max_depth: 4,
            ..FactoryConfig::default()
        });
    install_blueprints(&factory);
    factory
        .blueprint("Node", |b| {
            b.reference("parent");
        })
        .unwrap();

    let err = factory.make("Node").unwrap_err();
    assert!(matches!(err, LatheError::DepthExceeded(4)));
    assert_eq!(count(&factory, "Node"), 0);

    assert!(factory.make("Person").is_ok());
}

// ── plan ─────────────────────────────────────────────────────────

#[test]
fn plan_flattens_belongs_to() {
    let factory = blog();
    let plan = factory.plan("Comment").unwrap();

    assert_eq!(
        plan.keys().collect::<Vec<_>>(),
        vec!["body", "post_id", "author_id"]
    );
    assert!(!plan.contains_key("post"));
    let post_id = plan.get("post_id").and_then(AttributeValue::as_str).unwrap();
    let stored = factory
        .store()
        .get(&EntityId::parse(post_id).unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(stored.entity_type, "Post");
}

#[test]
fn plan_saves_nested_but_not_object() {
    let factory = blog();
    factory.plan("Comment").unwrap();
    assert_eq!(count(&factory, "Comment"), 0);
    assert_eq!(count(&factory, "Post"), 1);
    assert_eq!(count(&factory, "Person"), 2);
}

#[test]
fn plan_leaves_out_schema_defaults() {
    let factory = blog();
    let plan = factory.plan("Person").unwrap();
    assert_eq!(
        plan.keys().collect::<Vec<_>>(),
        vec!["name", "email", "password"]
    );
}

#[test]
fn plan_keeps_null_association() {
    let factory = blog();
    let plan = factory.construct("Comment").named("no_post").plan().unwrap();
    assert!(plan.get("post").unwrap().is_null());
    assert!(!plan.contains_key("post_id"));
}

#[test]
fn plan_of_overridden_association_uses_its_id() {
    let factory = blog();
    let post = factory.make("Post").unwrap();
    let plan = factory
        .construct("Comment")
        .with("post", post.clone())
        .plan()
        .unwrap();
    assert_eq!(plan.get("post_id"), Some(&AttributeValue::from(post.id.as_str())));
}

// ── make_unsaved ─────────────────────────────────────────────────

#[test]
fn make_unsaved_saves_nothing() {
    let factory = blog();
    let comment = factory.make_unsaved("Comment").unwrap();

    assert!(!comment.persisted);
    assert!(!comment.get_entity("post").unwrap().persisted);
    assert!(
        !comment
            .get_entity("post")
            .unwrap()
            .get_entity("author")
            .unwrap()
            .persisted
    );
    assert_eq!(count(&factory, "Comment"), 0);
    assert_eq!(count(&factory, "Post"), 0);
    assert_eq!(count(&factory, "Person"), 0);
}

#[test]
fn make_unsaved_block_saves_normally() {
    let factory = blog();
    let comment = factory
        .construct("Comment")
        .make_unsaved_then(|comment: &mut Entity| {
            let post = factory.make("Post")?;
            comment.assign("post", post);
            Ok(())
        })
        .unwrap();

    assert!(!comment.persisted);
    assert!(comment.get_entity("post").unwrap().persisted);
    assert_eq!(count(&factory, "Comment"), 0);
    assert_eq!(count(&factory, "Post"), 1);
}

#[test]
fn saving_resumes_after_make_unsaved() {
    let factory = blog();
    factory.make_unsaved("Post").unwrap();
    let post = factory.make("Post").unwrap();
    assert!(post.persisted);
    assert_eq!(count(&factory, "Post"), 1);
}

#[test]
fn saving_resumes_after_failed_make_unsaved() {
    let factory = blog();
    assert!(factory.construct("Post").named("nope").make_unsaved().is_err());
    assert!(factory.make("Post").unwrap().persisted);
}

#[test]
fn scope_make_inherits_suppression() {
    let factory = blog();
    factory
        .named_blueprint("Post", "scoped_author", |b| {
            b.attribute("author", |s: &mut Scope<'_>| {
                assert!(s.is_persist_suppressed());
                s.make("Person")
            });
        })
        .unwrap();
    let post = factory
        .construct("Post")
        .named("scoped_author")
        .make_unsaved()
        .unwrap();
    assert!(!post.get_entity("author").unwrap().persisted);
    assert_eq!(count(&factory, "Person"), 0);
}

// ── Stores ───────────────────────────────────────────────────────

/// Memory store whose reloads always fail.
#[derive(Default)]
struct FlakyRefreshStore {
    inner: MemoryStore,
    refreshes: AtomicUsize,
}

impl EntityStore for FlakyRefreshStore {
    fn persist(&self, entity: &mut Entity) -> StorageResult<()> {
        self.inner.persist(entity)
    }

    fn refresh(&self, entity: &mut Entity) -> StorageResult<()> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::NotFound(entity.id.to_string()))
    }

    fn get(&self, id: &EntityId) -> StorageResult<Option<Entity>> {
        self.inner.get(id)
    }

    fn count(&self, entity_type: &str) -> StorageResult<usize> {
        self.inner.count(entity_type)
    }

    fn clear(&self) -> StorageResult<()> {
        self.inner.clear()
    }
}

/// Store that refuses every write.
struct ReadOnlyStore;

impl EntityStore for ReadOnlyStore {
    fn persist(&self, _entity: &mut Entity) -> StorageResult<()> {
        Err(StorageError::InvalidData("store is read-only".into()))
    }

    fn refresh(&self, _entity: &mut Entity) -> StorageResult<()> {
        Ok(())
    }

    fn get(&self, _id: &EntityId) -> StorageResult<Option<Entity>> {
        Ok(None)
    }

    fn count(&self, _entity_type: &str) -> StorageResult<usize> {
        Ok(0)
    }

    fn clear(&self) -> StorageResult<()> {
        Ok(())
    }
}

fn factory_over(store: Arc<dyn EntityStore>, config: FactoryConfig) -> Factory {
    let catalog = Arc::new(catalog());
    let adapter = Arc::new(DocumentAdapter::new(Arc::clone(&catalog)));
    let factory = Factory::new(catalog, adapter, store)
        .with_generators(Arc::new(GeneratorRegistry::new()))
        .with_config(config);
    install_blueprints(&factory);
    factory
}

#[test]
fn refresh_failure_is_ignored() {
    let store = Arc::new(FlakyRefreshStore::default());
    let factory = factory_over(store.clone(), FactoryConfig::default());

    let person = factory.make("Person").unwrap();
    assert!(person.persisted);
    assert_eq!(store.refreshes.load(Ordering::SeqCst), 1);
}

#[test]
fn refresh_can_be_disabled() {
    let store = Arc::new(FlakyRefreshStore::default());
    let config = FactoryConfig {
        refresh_after_save: false,
        ..FactoryConfig::default()
    };
    let factory = factory_over(store.clone(), config);

    factory.make("Post").unwrap();
    assert_eq!(store.refreshes.load(Ordering::SeqCst), 0);
    assert_eq!(store.count("Post").unwrap(), 1);
}

#[test]
fn persist_failure_propagates() {
    let factory = factory_over(Arc::new(ReadOnlyStore), FactoryConfig::default());
    let err = factory.make("Person").unwrap_err();
    assert!(matches!(
        err,
        LatheError::Persistence(StorageError::InvalidData(_))
    ));
    assert!(factory.make_unsaved("Person").is_ok());
}

#[test]
fn strict_store_rejects_unknown_override() {
    let catalog = Arc::new(catalog());
    let adapter = Arc::new(DocumentAdapter::new(Arc::clone(&catalog)));
    let store = Arc::new(MemoryStore::strict(Arc::clone(&catalog)));
    let factory = Factory::new(catalog, adapter, store)
        .with_generators(Arc::new(GeneratorRegistry::new()));
    install_blueprints(&factory);

    let err = factory
        .construct("Person")
        .with("nickname", "Ace")
        .make()
        .unwrap_err();
    assert!(matches!(
        err,
        LatheError::Persistence(StorageError::UnknownAttribute { ref attribute, .. })
            if attribute == "nickname"
    ));

    let unsaved = factory
        .construct("Person")
        .with("nickname", "Ace")
        .make_unsaved()
        .unwrap();
    assert_eq!(unsaved.get_str("nickname"), Some("Ace"));
    assert!(factory.make("Comment").is_ok());
}

// ── Relational backend ───────────────────────────────────────────

fn relational_blog() -> Factory {
    let store = SqliteStore::open_in_memory().unwrap();
    let factory = Factory::relational(catalog(), store)
        .with_generators(Arc::new(GeneratorRegistry::new()));
    install_blueprints(&factory);
    factory
}

#[test]
fn relational_make_assigns_row_keys() {
    let factory = relational_blog();
    let post = factory.make("Post").unwrap();

    assert_eq!(post.get_entity("author").unwrap().id.as_row(), Some(1));
    assert_eq!(post.id.as_row(), Some(2));
    assert_eq!(count(&factory, "Post"), 1);
    assert_eq!(count(&factory, "Person"), 1);
}

#[test]
fn relational_plan_uses_numeric_foreign_keys() {
    let factory = relational_blog();
    let plan = factory.plan("Comment").unwrap();

    assert_eq!(plan.get("post_id"), Some(&AttributeValue::from(json!(2))));
    assert_eq!(plan.get("author_id"), Some(&AttributeValue::from(json!(3))));
    assert_eq!(count(&factory, "Comment"), 0);
}

#[test]
fn relational_explicit_id_is_kept() {
    let factory = relational_blog();
    let person = factory.construct("Person").named("fixed_id").make().unwrap();
    assert_eq!(person.id.as_str(), "person-42");
    assert_eq!(person.id.as_row(), None);
}

#[test]
fn constructors_pick_matching_adapter() {
    assert_eq!(blog().adapter().name(), "document");
    assert_eq!(relational_blog().adapter().name(), "relational");
}

#[test]
fn relational_numeric_override_id_is_not_reused() {
    let factory = relational_blog();
    let fixed = factory.construct("Person").with("id", 2).make().unwrap();
    let next = factory.make("Person").unwrap();

    assert_eq!(fixed.id.as_row(), Some(2));
    assert_eq!(next.id.as_row(), Some(3));
    assert!(next.persisted);
    assert_eq!(count(&factory, "Person"), 2);
}

#[test]
fn relational_plan_keeps_padded_key_as_text() {
    let factory = relational_blog();
    let post = factory.construct("Post").with("id", "007").make().unwrap();
    let plan = factory
        .construct("Comment")
        .with("post", post.clone())
        .plan()
        .unwrap();

    assert_eq!(post.id.as_str(), "007");
    assert_eq!(plan.get("post_id"), Some(&AttributeValue::from("007")));
    assert!(factory.store().get(&post.id).unwrap().is_some());
}

#[test]
fn relational_store_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fixtures.db");
    {
        let factory = Factory::relational(catalog(), SqliteStore::open(&path).unwrap())
            .with_generators(Arc::new(GeneratorRegistry::new()));
        install_blueprints(&factory);
        factory.make_many("Person", 3).unwrap();
    }
    let reopened = SqliteStore::open(&path).unwrap();
    assert_eq!(reopened.count("Person").unwrap(), 3);
}

// ── Threads ──────────────────────────────────────────────────────

const fn assert_send_sync<T: Send + Sync>() {}
const _: () = assert_send_sync::<Factory>();

#[test]
fn shared_factory_builds_from_many_threads() {
    let factory = Arc::new(blog());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let factory = Arc::clone(&factory);
            std::thread::spawn(move || factory.make_many("Post", 10).unwrap())
        })
        .collect();

    let titles: HashSet<String> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .filter_map(|p| p.get_str("title").map(String::from))
        .collect();
    assert_eq!(titles.len(), 40);
    assert_eq!(count(&factory, "Post"), 40);
    assert_eq!(count(&factory, "Person"), 40);
}

// ── Config ───────────────────────────────────────────────────────

#[test]
fn config_from_json_keeps_defaults() {
    let config = FactoryConfig::from_json(r#"{"max_depth": 3}"#).unwrap();
    assert_eq!(
        config,
        FactoryConfig {
            max_depth: 3,
            refresh_after_save: true,
        }
    );
    assert_eq!(FactoryConfig::from_json("{}").unwrap(), FactoryConfig::default());
}

#[test]
fn config_from_invalid_json_fails() {
    let err = FactoryConfig::from_json(r#"{"max_depth": "deep"}"#).unwrap_err();
    assert!(matches!(err, LatheError::Config(_)));
}
