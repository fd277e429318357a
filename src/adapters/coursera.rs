//! Coursera adapter over the platform's REST and GraphQL endpoints.
//!
//! Authentication is not handled here: the client is built from session
//! cookies captured elsewhere (a JSON file of `{name, value, domain}`).
//! Completion calls differ per item type; lectures use the course slug,
//! supplements and discussion prompts use the course id.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::domain::{CourseHierarchy, HierarchyItem, HierarchyLesson, HierarchyModule};

use super::{ContentService, IdentityProvider, ServiceError};

const BASE_URL: &str = "https://www.coursera.org/api/";
const GRAPHQL_URL: &str = "https://www.coursera.org/graphql-gateway";
const GRAPHQL_WRAPPER_URL: &str = "https://www.coursera.org/graphql-gateway-wrapper";

const MATERIAL_FIELDS: &str = "onDemandCourseMaterialModules.v1(name,slug,description,timeCommitment,lessonIds,optional,learningObjectives),\
onDemandCourseMaterialLessons.v1(name,slug,timeCommitment,elementIds,optional,trackId),\
onDemandCourseMaterialItems.v2(name,originalName,slug,timeCommitment,contentSummary,isLocked,lockableByItem,itemLockedReasonCode,trackId,lockedStatus,itemLockSummary),\
contentAtomRelations.v1(embeddedContentSourceCourseId,subContainerId)";

const SPEC_BY_SLUG_QUERY: &str = "query GetSpecializationBySlugForPromotionBanner($slug: String!) {\n  Specialization {\n    queryBySlug(slug: $slug) {\n      id\n      courses {\n        id\n        __typename\n      }\n      __typename\n    }\n    __typename\n  }\n}\n";

const SPEC_COURSES_QUERY: &str = "query OnDemandSpecializations($id: String!) {\n  OnDemandSpecializationsV1Resource {\n    get(id: $id) {\n      courses {\n        elements {\n          slug\n          __typename\n        }\n        __typename\n      }\n      __typename\n    }\n    __typename\n  }\n}\n";

/// Placeholder answer posted to discussion prompts
const DISCUSSION_ANSWER: &str = "<co-content><text>abc</text></co-content>";

/// A browser session cookie
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: Option<String>,
}

impl SessionCookie {
    /// Read a cookie file (a JSON array of cookies)
    pub fn load_file(path: &Path) -> Result<Vec<Self>> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read cookie file: {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse cookie file: {}", path.display()))
    }
}

/// Build the `Cookie` header value for a set of cookies
fn cookie_header(cookies: &[SessionCookie]) -> String {
    cookies
        .iter()
        .map(|c| format!("{}={}", c.name, c.value))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Coursera HTTP client
#[derive(Clone)]
pub struct CourseraClient {
    client: Client,
    base_url: String,
}

impl CourseraClient {
    /// Create a client that sends the given session cookies
    pub fn new(cookies: &[SessionCookie]) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if !cookies.is_empty() {
            let value = HeaderValue::from_str(&cookie_header(cookies))
                .context("Session cookies contain invalid header characters")?;
            headers.insert(COOKIE, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
        })
    }

    /// Create a client from a cookie file
    pub fn from_cookie_file(path: &Path) -> Result<Self> {
        let cookies = SessionCookie::load_file(path)?;
        Self::new(&cookies)
    }

    /// Build an API URL
    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Map transport errors and non-success statuses to `ServiceError`
    async fn check(response: std::result::Result<Response, reqwest::Error>) -> Result<Response, ServiceError> {
        let response = response.map_err(|e| ServiceError::Transient(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().to_string();
        Err(match status {
            StatusCode::NOT_FOUND => ServiceError::NotFound(url),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ServiceError::Unauthorized(format!("{} ({})", url, status))
            }
            s if s.is_server_error() || s == StatusCode::TOO_MANY_REQUESTS => {
                ServiceError::Transient(format!("{} ({})", url, status))
            }
            _ => ServiceError::InvalidResponse(format!("{} ({})", url, status)),
        })
    }

    async fn json_body(response: Response) -> Result<Value, ServiceError> {
        response
            .json::<Value>()
            .await
            .map_err(|e| ServiceError::InvalidResponse(e.to_string()))
    }

    async fn graphql(&self, url: &str, operation: &str, variables: Value, query: &str) -> Result<Value, ServiceError> {
        let body = json!([{
            "operationName": operation,
            "variables": variables,
            "query": query,
        }]);

        let response = Self::check(
            self.client
                .post(url)
                .query(&[("opname", operation)])
                .json(&body)
                .send()
                .await,
        )
        .await?;

        Self::json_body(response).await
    }

    /// Mark a lecture watched (uses the course slug)
    async fn mark_lecture_complete(
        &self,
        user_id: &str,
        course_slug: &str,
        item_id: &str,
    ) -> Result<bool, ServiceError> {
        debug!(%item_id, "Marking lecture complete");
        let url = self.api_url(&format!(
            "opencourse.v1/user/{}/course/{}/item/{}/lecture/videoEvents/ended",
            user_id, course_slug, item_id
        ));

        let response = Self::check(
            self.client
                .post(&url)
                .query(&[("autoEnroll", "false")])
                .json(&json!({ "contentRequestBody": {} }))
                .send()
                .await,
        )
        .await?;

        let data = Self::json_body(response).await?;
        Ok(data.pointer("/itemProgress/progressState").and_then(Value::as_str) == Some("Completed"))
    }

    /// Mark a supplement or reading completed (uses the course id)
    async fn mark_supplement_complete(
        &self,
        course_id: &str,
        item_id: &str,
        user_id: &str,
    ) -> Result<bool, ServiceError> {
        let user_id: i64 = user_id
            .parse()
            .map_err(|_| ServiceError::InvalidResponse(format!("Non-numeric user id: {}", user_id)))?;

        let response = Self::check(
            self.client
                .post(self.api_url("onDemandSupplementCompletions.v1"))
                .json(&json!({ "courseId": course_id, "itemId": item_id, "userId": user_id }))
                .send()
                .await,
        )
        .await?;

        let text = response
            .text()
            .await
            .map_err(|e| ServiceError::Transient(e.to_string()))?;
        Ok(text.contains("Completed"))
    }

    /// Look up the question id behind a discussion prompt
    async fn discussion_question_id(
        &self,
        user_id: &str,
        course_id: &str,
        item_id: &str,
    ) -> Result<Option<String>, ServiceError> {
        let url = self.api_url(&format!(
            "onDemandDiscussionPrompts.v1/{}~{}~{}",
            user_id, course_id, item_id
        ));

        let response = Self::check(
            self.client
                .get(&url)
                .query(&[
                    ("fields", "onDemandDiscussionPromptQuestions.v1(id)"),
                    ("includes", "question"),
                ])
                .send()
                .await,
        )
        .await?;

        let data = Self::json_body(response).await?;
        Ok(data
            .pointer("/linked/onDemandDiscussionPromptQuestions.v1/0/id")
            .and_then(Value::as_str)
            .and_then(|id| id.rsplit('~').next())
            .map(str::to_string))
    }

    /// Post a minimal answer to a discussion prompt (uses the course id)
    async fn skip_discussion(
        &self,
        course_id: &str,
        item_id: &str,
        user_id: &str,
    ) -> Result<bool, ServiceError> {
        debug!(%item_id, "Skipping discussion");
        let Some(question_id) = self.discussion_question_id(user_id, course_id, item_id).await? else {
            return Ok(false);
        };

        let response = self
            .client
            .post(self.api_url("onDemandCourseForumAnswers.v1/"))
            .json(&json!({
                "content": {
                    "typeName": "cml",
                    "definition": { "dtdId": "discussion/1", "value": DISCUSSION_ANSWER },
                },
                "courseForumQuestionId": format!("{}~{}", course_id, question_id),
            }))
            .send()
            .await
            .map_err(|e| ServiceError::Transient(e.to_string()))?;

        Ok(response.status().is_success())
    }
}

#[async_trait]
impl IdentityProvider for CourseraClient {
    async fn get_user_id(&self) -> Result<String, ServiceError> {
        let response = Self::check(
            self.client
                .get(self.api_url("adminUserPermissions.v1"))
                .query(&[("q", "my")])
                .send()
                .await,
        )
        .await?;

        let data = Self::json_body(response).await?;
        match data.pointer("/elements/0/id") {
            Some(Value::String(id)) => Ok(id.clone()),
            Some(Value::Number(id)) => Ok(id.to_string()),
            _ => Err(ServiceError::InvalidResponse(
                "No user id in permissions response".to_string(),
            )),
        }
    }
}

#[async_trait]
impl ContentService for CourseraClient {
    fn name(&self) -> &str {
        "coursera"
    }

    async fn get_course_data(&self, course_slug: &str) -> Result<CourseHierarchy, ServiceError> {
        let response = Self::check(
            self.client
                .get(self.api_url("onDemandCourseMaterials.v2/"))
                .query(&[
                    ("q", "slug"),
                    ("slug", course_slug),
                    ("includes", "modules,lessons,items"),
                    ("fields", MATERIAL_FIELDS),
                    ("showLockedItems", "true"),
                ])
                .send()
                .await,
        )
        .await?;

        let materials: CourseMaterials = response
            .json()
            .await
            .map_err(|e| ServiceError::InvalidResponse(e.to_string()))?;

        materials.into_hierarchy(course_slug)
    }

    async fn get_specialization_courses(
        &self,
        spec_slug: &str,
    ) -> Result<Vec<String>, ServiceError> {
        let data = self
            .graphql(
                GRAPHQL_URL,
                "GetSpecializationBySlugForPromotionBanner",
                json!({ "slug": spec_slug }),
                SPEC_BY_SLUG_QUERY,
            )
            .await?;

        let spec_id = data
            .pointer("/0/data/Specialization/queryBySlug/id")
            .and_then(Value::as_str)
            .ok_or_else(|| ServiceError::NotFound(spec_slug.to_string()))?
            .to_string();

        let data = self
            .graphql(
                GRAPHQL_WRAPPER_URL,
                "OnDemandSpecializations",
                json!({ "id": spec_id }),
                SPEC_COURSES_QUERY,
            )
            .await?;

        Ok(specialization_slugs(&data))
    }

    async fn bypass_item(
        &self,
        item_id: &str,
        item_type: &str,
        course_id: &str,
        course_slug: &str,
        user_id: &str,
    ) -> Result<bool, ServiceError> {
        match item_type {
            "lecture" => self.mark_lecture_complete(user_id, course_slug, item_id).await,
            "discussionPrompt" => self.skip_discussion(course_id, item_id, user_id).await,
            "supplement" => self.mark_supplement_complete(course_id, item_id, user_id).await,
            other => Err(ServiceError::UnsupportedItemType(other.to_string())),
        }
    }
}

/// Course slugs from an `OnDemandSpecializations` response, in order
fn specialization_slugs(data: &Value) -> Vec<String> {
    data.pointer("/0/data/OnDemandSpecializationsV1Resource/get/courses/elements")
        .and_then(Value::as_array)
        .map(|elements| {
            elements
                .iter()
                .filter_map(|e| e.get("slug").and_then(Value::as_str))
                .filter(|slug| !slug.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Response of `onDemandCourseMaterials.v2`
#[derive(Debug, Deserialize)]
struct CourseMaterials {
    #[serde(default)]
    elements: Vec<MaterialElement>,
    #[serde(default)]
    linked: LinkedMaterials,
}

#[derive(Debug, Deserialize)]
struct MaterialElement {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
struct LinkedMaterials {
    #[serde(rename = "onDemandCourseMaterialModules.v1", default)]
    modules: Vec<ModuleRecord>,
    #[serde(rename = "onDemandCourseMaterialLessons.v1", default)]
    lessons: Vec<LessonRecord>,
    #[serde(rename = "onDemandCourseMaterialItems.v2", default)]
    items: Vec<ItemRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModuleRecord {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    lesson_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LessonRecord {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    item_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemRecord {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    content_summary: Option<ContentSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContentSummary {
    #[serde(default)]
    type_name: Option<String>,
}

impl CourseMaterials {
    fn into_hierarchy(self, course_slug: &str) -> Result<CourseHierarchy, ServiceError> {
        let course_id = self
            .elements
            .into_iter()
            .next()
            .map(|e| e.id)
            .ok_or_else(|| ServiceError::NotFound(course_slug.to_string()))?;

        let mut hierarchy = CourseHierarchy::new(course_id);
        for module in self.linked.modules {
            hierarchy.add_module(HierarchyModule {
                id: module.id,
                name: module.name,
                lesson_ids: module.lesson_ids,
            });
        }
        for lesson in self.linked.lessons {
            hierarchy.add_lesson(HierarchyLesson {
                id: lesson.id,
                name: lesson.name,
                item_ids: lesson.item_ids,
            });
        }
        for item in self.linked.items {
            hierarchy.add_item(HierarchyItem {
                id: item.id,
                name: item.name,
                type_name: item.content_summary.and_then(|s| s.type_name),
            });
        }

        Ok(hierarchy)
    }
}

/// Parse a raw `onDemandCourseMaterials.v2` body into a hierarchy
pub fn parse_course_materials(body: &str, course_slug: &str) -> Result<CourseHierarchy, ServiceError> {
    let materials: CourseMaterials =
        serde_json::from_str(body).map_err(|e| ServiceError::InvalidResponse(e.to_string()))?;
    materials.into_hierarchy(course_slug)
}
