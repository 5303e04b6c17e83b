use async_trait::async_trait;
use sea_orm::EntityTrait;
use uuid::Uuid;

use crate::{
    db::OrmConn, entity::users::Entity as Users, error::AppResult, repository::UserDirectory,
};

#[derive(Clone)]
pub struct PgUserDirectory {
    orm: OrmConn,
}

impl PgUserDirectory {
    pub fn new(orm: OrmConn) -> Self {
        Self { orm }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_role(&self, user_id: Uuid) -> AppResult<Option<String>> {
        let user = Users::find_by_id(user_id).one(&self.orm).await?;
        Ok(user.map(|u| u.role))
    }
}
