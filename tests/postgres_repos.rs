use sqlx::PgPool;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;
use yatube::{
    application::{
        pagination::PageWindow,
        repos::{
            CommentsRepo, CreateCommentParams, CreateGroupParams, CreatePostParams,
            CreateUserParams, FollowsRepo, GroupsRepo, PostFilter, PostsRepo, PostsWriteRepo,
            RepoError, SessionsRepo, UpdatePostParams, UsersRepo,
        },
    },
    domain::entities::{GroupRecord, SessionRecord, UserRecord},
    infra::db::PostgresRepositories,
};

async fn user(repos: &PostgresRepositories, username: &str) -> UserRecord {
    repos
        .create_user(CreateUserParams {
            username: username.to_string(),
            password_hash: "hash".to_string(),
        })
        .await
        .expect("user")
}

async fn post(
    repos: &PostgresRepositories,
    author: &UserRecord,
    text: &str,
    group_id: Option<i64>,
) -> i64 {
    repos
        .create_post(CreatePostParams {
            author_id: author.id,
            text: text.to_string(),
            group_id,
            image: None,
        })
        .await
        .expect("post")
        .id
}

async fn group(repos: &PostgresRepositories, slug: &str) -> GroupRecord {
    repos
        .create_group(CreateGroupParams {
            title: slug.to_string(),
            slug: slug.to_string(),
            description: String::new(),
        })
        .await
        .expect("group")
}

fn window(offset: u64, limit: u64) -> PageWindow {
    PageWindow { offset, limit }
}

#[sqlx::test(migrations = "./migrations")]
async fn duplicate_usernames_and_slugs_are_rejected(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    user(&repos, "leo").await;

    let err = repos
        .create_user(CreateUserParams {
            username: "leo".to_string(),
            password_hash: "hash".to_string(),
        })
        .await
        .expect_err("duplicate username");
    assert!(matches!(err, RepoError::Duplicate { .. }));

    let params = CreateGroupParams {
        title: "Cats".to_string(),
        slug: "cats".to_string(),
        description: "Everything about cats".to_string(),
    };
    repos.create_group(params.clone()).await.expect("group");
    let err = repos.create_group(params).await.expect_err("duplicate slug");
    assert!(matches!(err, RepoError::Duplicate { .. }));

    let found = repos
        .find_group_by_slug("cats")
        .await
        .expect("lookup")
        .expect("group exists");
    assert_eq!(found.title, "Cats");
}

#[sqlx::test(migrations = "./migrations")]
async fn feeds_are_filtered_and_ordered_newest_first(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let leo = user(&repos, "leo").await;
    let tolstoy = user(&repos, "tolstoy").await;
    let reader = user(&repos, "reader").await;
    let cats = repos
        .create_group(CreateGroupParams {
            title: "Cats".to_string(),
            slug: "cats".to_string(),
            description: String::new(),
        })
        .await
        .expect("group");

    let first = post(&repos, &leo, "first", Some(cats.id)).await;
    let second = post(&repos, &tolstoy, "second", None).await;
    let third = post(&repos, &leo, "third", None).await;

    assert_eq!(repos.count_posts(PostFilter::All).await.expect("count"), 3);
    let all = repos
        .list_posts(PostFilter::All, window(0, 10))
        .await
        .expect("list");
    let ids: Vec<i64> = all.iter().map(|post| post.id).collect();
    assert_eq!(ids, vec![third, second, first]);

    let page = repos
        .list_posts(PostFilter::All, window(2, 2))
        .await
        .expect("second page");
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, first);

    let grouped = repos
        .list_posts(PostFilter::Group(cats.id), window(0, 10))
        .await
        .expect("group list");
    assert_eq!(grouped.len(), 1);
    assert_eq!(grouped[0].group_slug.as_deref(), Some("cats"));
    assert_eq!(grouped[0].author_username, "leo");

    assert_eq!(
        repos
            .count_posts(PostFilter::Author(leo.id))
            .await
            .expect("author count"),
        2
    );

    assert!(repos.follow(reader.id, tolstoy.id).await.expect("follow"));
    let followed = repos
        .list_posts(PostFilter::FollowedBy(reader.id), window(0, 10))
        .await
        .expect("follow feed");
    assert_eq!(followed.len(), 1);
    assert_eq!(followed[0].id, second);
}

#[sqlx::test(migrations = "./migrations")]
async fn writes_only_touch_posts_owned_by_the_author(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let leo = user(&repos, "leo").await;
    let intruder = user(&repos, "intruder").await;
    let cats = group(&repos, "cats").await;
    let dogs = group(&repos, "dogs").await;
    let id = post(&repos, &leo, "original", Some(cats.id)).await;

    let denied = repos
        .update_post(UpdatePostParams {
            id,
            author_id: intruder.id,
            text: "defaced".to_string(),
            group_id: Some(dogs.id),
            image: Some("posts/dog.gif".to_string()),
        })
        .await
        .expect("update");
    assert!(denied.is_none());
    let kept = repos.find_post(id).await.expect("find").expect("post kept");
    assert_eq!(kept.text, "original");
    assert_eq!(kept.group_id, Some(cats.id));
    assert_eq!(kept.image, None);

    let updated = repos
        .update_post(UpdatePostParams {
            id,
            author_id: leo.id,
            text: "edited".to_string(),
            group_id: None,
            image: Some("posts/cat.gif".to_string()),
        })
        .await
        .expect("update")
        .expect("author owns the post");
    assert_eq!(updated.text, "edited");
    assert_eq!(updated.image.as_deref(), Some("posts/cat.gif"));

    repos
        .create_comment(CreateCommentParams {
            post_id: id,
            author_id: intruder.id,
            text: "first!".to_string(),
        })
        .await
        .expect("comment");
    let comments = repos.list_comments(id).await.expect("comments");
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].author_username, "intruder");

    assert!(
        repos
            .delete_post(id, intruder.id)
            .await
            .expect("delete")
            .is_none()
    );
    assert!(repos.delete_post(id, leo.id).await.expect("delete").is_some());
    assert!(repos.find_post(id).await.expect("find").is_none());
    assert!(repos.list_comments(id).await.expect("comments").is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn follows_are_unique_and_never_self_referencing(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let leo = user(&repos, "leo").await;
    let reader = user(&repos, "reader").await;

    assert!(repos.follow(reader.id, leo.id).await.expect("follow"));
    assert!(!repos.follow(reader.id, leo.id).await.expect("repeat"));
    assert!(repos.is_following(reader.id, leo.id).await.expect("check"));
    assert!(!repos.is_following(leo.id, reader.id).await.expect("check"));

    assert!(repos.follow(leo.id, leo.id).await.is_err());

    assert!(repos.unfollow(reader.id, leo.id).await.expect("unfollow"));
    assert!(!repos.unfollow(reader.id, leo.id).await.expect("repeat"));
}

#[sqlx::test(migrations = "./migrations")]
async fn expired_sessions_are_purged(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let leo = user(&repos, "leo").await;
    let now = OffsetDateTime::now_utc();

    let live = SessionRecord {
        id: Uuid::new_v4(),
        secret_hash: vec![1; 32],
        user_id: leo.id,
        created_at: now,
        expires_at: now + Duration::days(1),
    };
    let stale = SessionRecord {
        id: Uuid::new_v4(),
        secret_hash: vec![2; 32],
        user_id: leo.id,
        created_at: now - Duration::days(2),
        expires_at: now - Duration::days(1),
    };
    repos.create_session(live.clone()).await.expect("live");
    repos.create_session(stale.clone()).await.expect("stale");

    assert_eq!(repos.delete_expired_sessions(now).await.expect("purge"), 1);
    let found = repos
        .find_session(live.id)
        .await
        .expect("find")
        .expect("live session kept");
    assert_eq!(found.secret_hash, live.secret_hash);
    assert!(repos.find_session(stale.id).await.expect("find").is_none());

    repos.delete_session(live.id).await.expect("delete");
    assert!(repos.find_session(live.id).await.expect("find").is_none());
}
