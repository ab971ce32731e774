use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::{Expr, Func, LikeExpr, OnConflict, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

use crate::db::entities::{groups, songs};
use crate::error::Result;

/// Optional filters for song listing. Unset fields do not constrain the query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SongFilter {
    pub group: Option<String>,
    pub title: Option<String>,
    pub text: Option<String>,
    pub link: Option<String>,
    pub release_date: Option<NaiveDate>,
}

/// Fields of a song about to be created under a group name.
#[derive(Debug, Clone)]
pub struct NewSong {
    pub title: String,
    pub release_date: NaiveDate,
    pub text: String,
    pub link: String,
}

#[derive(Clone)]
pub struct GroupRepository {
    db: DatabaseConnection,
}

impl GroupRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<groups::Model>> {
        Ok(groups::Entity::find_by_id(id).one(&self.db).await?)
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<groups::Model>> {
        Ok(groups::Entity::find()
            .filter(groups::Column::Name.eq(name))
            .one(&self.db)
            .await?)
    }
}

/// Insert the group unless the name is taken, then read it back.
async fn ensure_group<C: ConnectionTrait>(conn: &C, name: &str) -> Result<groups::Model> {
    let group = groups::ActiveModel {
        name: Set(name.to_string()),
        ..Default::default()
    };

    groups::Entity::insert(group)
        .on_conflict(
            OnConflict::column(groups::Column::Name)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    let group = groups::Entity::find()
        .filter(groups::Column::Name.eq(name))
        .one(conn)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("group {name}")))?;

    Ok(group)
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Case-insensitive substring match on a column.
///
/// The needle is folded the way the backend's `LOWER()` folds the column:
/// Postgres folds all of Unicode, SQLite only ASCII. On SQLite a non-ASCII
/// needle therefore matches only with the stored letter case.
fn contains_ci<E, C>(backend: DbBackend, entity: E, column: C, needle: &str) -> SimpleExpr
where
    E: EntityTrait,
    C: ColumnTrait,
{
    let folded = match backend {
        DbBackend::Sqlite => needle.to_ascii_lowercase(),
        _ => needle.to_lowercase(),
    };
    let pattern = format!("%{}%", escape_like(&folded));
    Expr::expr(Func::lower(Expr::col((entity, column)))).like(LikeExpr::new(pattern).escape('\\'))
}

#[derive(Clone)]
pub struct SongRepository {
    db: DatabaseConnection,
}

impl SongRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<songs::Model>> {
        Ok(songs::Entity::find_by_id(id).one(&self.db).await?)
    }

    pub async fn find_with_group(
        &self,
        id: i32,
    ) -> Result<Option<(songs::Model, Option<groups::Model>)>> {
        Ok(songs::Entity::find_by_id(id)
            .find_also_related(groups::Entity)
            .one(&self.db)
            .await?)
    }

    pub async fn find_by_group_and_title(
        &self,
        group: &str,
        title: &str,
    ) -> Result<Option<songs::Model>> {
        Ok(songs::Entity::find()
            .inner_join(groups::Entity)
            .filter(groups::Column::Name.eq(group))
            .filter(songs::Column::Title.eq(title))
            .one(&self.db)
            .await?)
    }

    /// Another song in `group_id` already carrying `title`, other than `exclude_id`.
    pub async fn title_taken(&self, group_id: i32, title: &str, exclude_id: i32) -> Result<bool> {
        let existing = songs::Entity::find()
            .filter(songs::Column::GroupId.eq(group_id))
            .filter(songs::Column::Title.eq(title))
            .filter(songs::Column::Id.ne(exclude_id))
            .one(&self.db)
            .await?;

        Ok(existing.is_some())
    }

    pub async fn list(
        &self,
        filter: &SongFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<(songs::Model, Option<groups::Model>)>> {
        let backend = self.db.get_database_backend();
        let mut select = songs::Entity::find().find_also_related(groups::Entity);

        if let Some(group) = &filter.group {
            select = select.filter(contains_ci(backend, groups::Entity, groups::Column::Name, group));
        }

        if let Some(title) = &filter.title {
            select = select.filter(contains_ci(backend, songs::Entity, songs::Column::Title, title));
        }

        if let Some(text) = &filter.text {
            select = select.filter(contains_ci(backend, songs::Entity, songs::Column::Text, text));
        }

        if let Some(link) = &filter.link {
            select = select.filter(contains_ci(backend, songs::Entity, songs::Column::Link, link));
        }

        if let Some(date) = filter.release_date {
            select = select.filter(songs::Column::ReleaseDate.eq(date));
        }

        Ok(select
            .order_by_asc(songs::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await?)
    }

    /// Create the song, and its group if needed, in one transaction.
    ///
    /// Both inserts tolerate a concurrent writer having won the race: the row
    /// that ends up stored is returned either way.
    pub async fn create_with_group(&self, group: &str, song: NewSong) -> Result<songs::Model> {
        let txn = self.db.begin().await?;

        let group = ensure_group(&txn, group).await?;

        let active = songs::ActiveModel {
            group_id: Set(group.id),
            title: Set(song.title.clone()),
            release_date: Set(song.release_date),
            text: Set(song.text),
            link: Set(song.link),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };

        songs::Entity::insert(active)
            .on_conflict(
                OnConflict::columns([songs::Column::GroupId, songs::Column::Title])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;

        let stored = songs::Entity::find()
            .filter(songs::Column::GroupId.eq(group.id))
            .filter(songs::Column::Title.eq(song.title.as_str()))
            .one(&txn)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("song {}", song.title)))?;

        txn.commit().await?;

        Ok(stored)
    }

    pub async fn update(&self, song: songs::ActiveModel) -> Result<songs::Model> {
        Ok(song.update(&self.db).await?)
    }

    pub async fn delete(&self, id: i32) -> Result<u64> {
        let result = songs::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected)
    }
}
