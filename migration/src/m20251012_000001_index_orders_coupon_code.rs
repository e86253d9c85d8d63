use sea_orm_migration::prelude::*;

/// 优惠券使用次数由订单的 coupon_code 统计得出，需要索引
#[derive(DeriveIden)]
enum Orders {
    Table,
    UserId,
    CouponCode,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_orders_coupon_code_user")
                    .table(Orders::Table)
                    .col(Orders::CouponCode)
                    .col(Orders::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_orders_created_at")
                    .table(Orders::Table)
                    .col(Orders::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .if_exists()
                    .name("idx_orders_created_at")
                    .table(Orders::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .if_exists()
                    .name("idx_orders_coupon_code_user")
                    .table(Orders::Table)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}
