//! News, knowledge base, articles and banners.

use crate::config::{ColumnDef, ColumnType, ModelDef, OnDelete, Query, TableDef, View, ViewSet};
use crate::language::Language;
use crate::serializer::Serializer;
use serde_json::json;

const TITLE: ColumnType = ColumnType::Varchar(255);

fn image() -> ColumnDef {
    ColumnDef::new("image_id", ColumnType::BigInt)
        .nullable()
        .references("files", OnDelete::SetNull)
}

fn draft() -> ColumnDef {
    ColumnDef::new("is_draft", ColumnType::Bool).default_sql("FALSE")
}

/// News and knowledge base entries share one shape.
fn post_table(name: &str) -> TableDef {
    TableDef::new(name)
        .translated("title", TITLE)
        .translated("description", ColumnType::Text)
        .translated("content", ColumnType::Text)
        .column(image())
        .column(draft())
        .created_at()
}

/// Get, Post, Retrieve and MainPage serializers for a news-shaped table.
fn post_serializers(prefix: &str, retrieve: &str, table: &str) -> Vec<Serializer> {
    vec![
        Serializer::new(format!("Get{}", prefix), table)
            .id()
            .localized("title")
            .localized("description")
            .localized("content")
            .nested("image", "image_id", "File")
            .column("is_draft")
            .read_only("created_at"),
        Serializer::new(format!("Post{}", prefix), table)
            .id()
            .translations("title")
            .translations("description")
            .translations("content")
            .foreign_key("image", "image_id")
            .column("is_draft"),
        Serializer::new(retrieve, table)
            .id()
            .translations("title")
            .translations("description")
            .translations("content")
            .nested("image", "image_id", "File")
            .column("is_draft")
            .read_only("created_at"),
        Serializer::new(format!("{}MainPage", prefix), table)
            .id()
            .localized("title")
            .localized("description")
            .nested("image", "image_id", "File")
            .read_only("created_at"),
    ]
}

fn published() -> Query {
    Query::new().scope("is_draft", json!(false)).order_by("-id")
}

fn public_page() -> Query {
    published().paginated().orderable("created_at")
}

pub fn model() -> ModelDef {
    let mut serializers = post_serializers("News", "RetrieveNews", "news");
    serializers.extend(post_serializers("KnowledgeBase", "RetrieveKnowledgeBase", "knowledge_base"));
    serializers.extend([
        Serializer::new("GetArticle", "articles")
            .id()
            .localized("name")
            .localized("content")
            .nested("image", "image_id", "File")
            .column("is_draft")
            .read_only("created_at"),
        Serializer::new("PostArticle", "articles")
            .id()
            .translations("name")
            .translations("content")
            .foreign_key("image", "image_id")
            .column("is_draft"),
        Serializer::new("GetBanner", "banners")
            .id()
            .localized("title")
            .localized("description")
            .column("link")
            .nested("image", "image_id", "File"),
        Serializer::new("PostBanner", "banners")
            .id()
            .translations("title")
            .translations("description")
            .column("link")
            .foreign_key("image", "image_id"),
        Serializer::new("RetrieveBanner", "banners")
            .id()
            .translations("title")
            .translations("description")
            .column("link")
            .nested("image", "image_id", "File"),
        Serializer::new("BannerMainPage", "banners")
            .id()
            .localized("title")
            .localized("description")
            .column("link")
            .nested("image", "image_id", "File"),
    ]);

    let article_names: Vec<String> = Language::ALL.iter().map(|l| l.column("name")).collect();
    let newest = || Query::new().paginated().order_by("-id").filter("is_draft", "is_draft");

    ModelDef {
        tables: vec![
            post_table("news"),
            post_table("knowledge_base"),
            TableDef::new("articles")
                .translated("name", TITLE)
                .translated("content", ColumnType::Text)
                .column(image())
                .column(draft())
                .created_at(),
            TableDef::new("banners")
                .translated("title", TITLE)
                .translated("description", ColumnType::Text)
                .column(ColumnDef::new("link", ColumnType::Varchar(500)).nullable())
                .column(image())
                .created_at(),
        ],
        many_to_many: Vec::new(),
        serializers,
        viewsets: vec![
            ViewSet::new("content.news", "/content/news/", "news")
                .serializers("GetNews", "PostNews")
                .query(newest()),
            ViewSet::new("content.knowledge_base", "/content/knowledge-base/", "knowledge_base")
                .serializers("GetKnowledgeBase", "PostKnowledgeBase")
                .query(newest()),
            ViewSet::new("content.article", "/content/article/", "articles")
                .serializers("GetArticle", "PostArticle")
                .query(newest().search(&article_names)),
            ViewSet::new("content.banner", "/content/banner/", "banners")
                .serializers("GetBanner", "PostBanner")
                .query(Query::new().paginated().order_by("-id")),
        ],
        views: vec![
            View::retrieve("content.news.all", "/content/news/{id}/all/", "news", "RetrieveNews", Query::new()),
            View::list(
                "content.news.landing",
                "/content/news/landing-page/",
                "news",
                "NewsMainPage",
                published().limit(3),
            ),
            View::retrieve(
                "content.news.landing.detail",
                "/content/news/landing-page/{id}/",
                "news",
                "GetNews",
                published(),
            ),
            View::list("content.news.page", "/content/news/page/", "news", "NewsMainPage", public_page()),
            View::retrieve(
                "content.knowledge_base.all",
                "/content/knowledge-base/{id}/all/",
                "knowledge_base",
                "RetrieveKnowledgeBase",
                Query::new(),
            ),
            View::list(
                "content.knowledge_base.page",
                "/content/knowledge-base/page/",
                "knowledge_base",
                "KnowledgeBaseMainPage",
                public_page(),
            ),
            View::retrieve(
                "content.article.all",
                "/content/article/{id}/all/",
                "articles",
                "PostArticle",
                Query::new(),
            ),
            View::retrieve(
                "content.banner.all",
                "/content/banner/{id}/all/",
                "banners",
                "RetrieveBanner",
                Query::new(),
            ),
            View::list(
                "content.banner.main_page",
                "/content/banner/main-page/",
                "banners",
                "BannerMainPage",
                Query::new().order_by("-id"),
            ),
        ],
    }
}
