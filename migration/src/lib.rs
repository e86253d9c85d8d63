pub use sea_orm_migration::prelude::*;

mod m20251001_000001_initial;
mod m20251008_000001_add_coupons;
mod m20251012_000001_index_orders_coupon_code;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251001_000001_initial::Migration),
            Box::new(m20251008_000001_add_coupons::Migration),
            Box::new(m20251012_000001_index_orders_coupon_code::Migration),
        ]
    }
}
