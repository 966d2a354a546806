pub mod products;
pub mod users;

use seed_kernel::CollectionRegistry;

/// Register every seeded collection; users are provisioned before products
pub fn register_all(registry: &mut CollectionRegistry) {
    registry.register(users::create_module());
    registry.register(products::create_module());
}

/// Registry holding every seeded collection
pub fn registry() -> CollectionRegistry {
    let mut registry = CollectionRegistry::new();
    register_all(&mut registry);
    registry
}
