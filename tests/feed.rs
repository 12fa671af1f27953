mod support;

use time::{Duration, OffsetDateTime};
use yatube::{
    application::feed::FeedError,
    domain::types::Viewer,
};

use support::{InMemoryRepos, feed_service, follow_service, member};

#[tokio::test]
async fn index_splits_thirteen_posts_into_ten_and_three() {
    let repos = InMemoryRepos::new();
    let leo = repos.user("leo").await;
    let start = OffsetDateTime::now_utc();
    for n in 0..13 {
        repos
            .post_at(&leo, &format!("post {n}"), None, start + Duration::minutes(n))
            .await;
    }
    let feed = feed_service(&repos);

    let first = feed.index(None).await.expect("first page");
    assert_eq!(first.items.len(), 10);
    assert_eq!(first.number, 1);
    assert_eq!(first.num_pages, 2);
    assert_eq!(first.items[0].text, "post 12");

    let second = feed.index(Some("2")).await.expect("second page");
    assert_eq!(second.items.len(), 3);
    assert_eq!(second.items[2].text, "post 0");

    let clamped = feed.index(Some("99")).await.expect("clamped page");
    assert_eq!(clamped.number, 2);

    let garbage = feed.index(Some("abc")).await.expect("garbage page");
    assert_eq!(garbage.number, 1);
}

#[tokio::test]
async fn equal_publication_times_fall_back_to_newest_id() {
    let repos = InMemoryRepos::new();
    let leo = repos.user("leo").await;
    let at = OffsetDateTime::now_utc();
    let older = repos.post_at(&leo, "older", None, at).await;
    let newer = repos.post_at(&leo, "newer", None, at).await;

    let page = feed_service(&repos).index(None).await.expect("index");
    let ids: Vec<i64> = page.items.iter().map(|post| post.id).collect();
    assert_eq!(ids, vec![newer.id, older.id]);
}

#[tokio::test]
async fn group_feed_only_lists_posts_in_that_group() {
    let repos = InMemoryRepos::new();
    let leo = repos.user("leo").await;
    let cats = repos.group("Cats", "cats").await;
    let dogs = repos.group("Dogs", "dogs").await;
    repos.post(&leo, "about cats", Some(&cats)).await;
    repos.post(&leo, "about dogs", Some(&dogs)).await;
    repos.post(&leo, "about nothing", None).await;

    let feed = feed_service(&repos);
    let group_feed = feed.group("cats", None).await.expect("group feed");
    assert_eq!(group_feed.group.title, "Cats");
    assert_eq!(group_feed.page.items.len(), 1);
    assert_eq!(group_feed.page.items[0].text, "about cats");
    assert_eq!(group_feed.page.items[0].group_slug.as_deref(), Some("cats"));

    let err = feed.group("birds", None).await.err().expect("unknown group");
    assert!(matches!(err, FeedError::UnknownGroup));
}

#[tokio::test]
async fn profile_counts_posts_and_reports_follow_state() {
    let repos = InMemoryRepos::new();
    let leo = repos.user("leo").await;
    let reader = repos.user("reader").await;
    let other = repos.user("other").await;
    for n in 0..3 {
        repos.post(&leo, &format!("leo {n}"), None).await;
    }
    repos.post(&other, "other", None).await;

    let feed = feed_service(&repos);
    let anonymous = feed
        .profile("leo", &Viewer::Anonymous, None)
        .await
        .expect("profile");
    assert_eq!(anonymous.post_count, 3);
    assert_eq!(anonymous.page.items.len(), 3);
    assert!(anonymous.page.items.iter().all(|post| post.author_id == leo.id));
    assert!(!anonymous.following);

    follow_service(&repos)
        .follow(&member(&reader), "leo")
        .await
        .expect("follow");
    let followed = feed
        .profile("leo", &Viewer::Member(member(&reader)), None)
        .await
        .expect("profile");
    assert!(followed.following);
    assert!(!followed.is_self);

    let own = feed
        .profile("leo", &Viewer::Member(member(&leo)), None)
        .await
        .expect("own profile");
    assert!(own.is_self);
    assert!(!own.following);

    let err = feed
        .profile("ghost", &Viewer::Anonymous, None)
        .await
        .err()
        .expect("unknown author");
    assert!(matches!(err, FeedError::UnknownAuthor));
}

#[tokio::test]
async fn follow_feed_lists_only_followed_authors() {
    let repos = InMemoryRepos::new();
    let leo = repos.user("leo").await;
    let tolstoy = repos.user("tolstoy").await;
    let reader = repos.user("reader").await;
    let lonely = repos.user("lonely").await;
    repos.post(&leo, "from leo", None).await;
    repos.post(&tolstoy, "from tolstoy", None).await;

    follow_service(&repos)
        .follow(&member(&reader), "leo")
        .await
        .expect("follow");

    let feed = feed_service(&repos);
    let page = feed
        .follow_feed(&member(&reader), None)
        .await
        .expect("follow feed");
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].author_username, "leo");

    let empty = feed
        .follow_feed(&member(&lonely), None)
        .await
        .expect("empty feed");
    assert!(empty.items.is_empty());
    assert_eq!(empty.num_pages, 1);
}

#[tokio::test]
async fn post_detail_includes_author_count_and_comments() {
    let repos = InMemoryRepos::new();
    let leo = repos.user("leo").await;
    let post = repos.post(&leo, "first", None).await;
    repos.post(&leo, "second", None).await;

    let posts = support::post_service(&repos);
    posts
        .add_comment(&member(&leo), post.id, "nice")
        .await
        .expect("comment");

    let detail = feed_service(&repos)
        .post_detail(post.id)
        .await
        .expect("detail");
    assert_eq!(detail.post.id, post.id);
    assert_eq!(detail.author_post_count, 2);
    assert_eq!(detail.comments.len(), 1);
    assert_eq!(detail.comments[0].author_username, "leo");

    let err = feed_service(&repos)
        .post_detail(9999)
        .await
        .err()
        .expect("unknown post");
    assert!(matches!(err, FeedError::UnknownPost));
}
