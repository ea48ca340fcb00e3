use core::fmt::Display;

use reqwest::header::{ACCEPT, HeaderValue};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::types::Outcome;

use super::BackendClient;

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";
const RETURN_REPRESENTATION: &str = "return=representation";

/// Builder for a request on one table.
///
/// Filters use the backend's `column=operator.value` syntax. Nothing is sent
/// until one of [`fetch`](Query::fetch), [`insert`](Query::insert),
/// [`update`](Query::update) or [`delete`](Query::delete) is awaited.
#[must_use = "queries do nothing until executed"]
#[derive(Debug, Clone)]
pub struct Query {
    client: BackendClient,
    table: String,
    columns: Option<String>,
    filters: Vec<(String, String)>,
    order: Vec<String>,
    limit: Option<usize>,
    single: bool,
    context: Option<String>,
}

impl Query {
    pub(super) fn new(client: BackendClient, table: &str) -> Self {
        Self {
            client,
            table: table.to_owned(),
            columns: None,
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
            single: false,
            context: None,
        }
    }

    /// Columns to return, including embedded relations such as
    /// `*, association:associations(id, name)`.
    pub fn select(mut self, columns: &str) -> Self {
        let compact: String = columns.split_whitespace().collect();
        self.columns = Some(compact);
        self
    }

    pub fn eq(self, column: &str, value: impl Display) -> Self {
        self.filter(column, format!("eq.{value}"))
    }

    pub fn gte(self, column: &str, value: impl Display) -> Self {
        self.filter(column, format!("gte.{value}"))
    }

    pub fn lte(self, column: &str, value: impl Display) -> Self {
        self.filter(column, format!("lte.{value}"))
    }

    /// Keeps rows whose `column` is one of `values`.
    pub fn in_<I>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Display,
    {
        let list = values.into_iter().map(|v| v.to_string()).collect::<Vec<_>>().join(",");
        self.filter(column, format!("in.({list})"))
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.order.push(format!("{column}.{direction}"));
        self
    }

    pub fn limit(mut self, count: usize) -> Self {
        self.limit = Some(count);
        self
    }

    /// Expects exactly one row and decodes it as an object instead of a list.
    pub fn single(mut self) -> Self {
        self.single = true;
        self
    }

    /// Overrides the label used in logs and telemetry.
    pub fn context(mut self, label: impl Into<String>) -> Self {
        self.context = Some(label.into());
        self
    }

    pub async fn fetch<T: DeserializeOwned>(self) -> Outcome<T> {
        let label = self.label("select");
        let request = self.build(Method::GET);
        self.client.call(request, &label).await
    }

    /// Inserts `body` (a row or a list of rows) and returns what was stored.
    pub async fn insert<B, T>(self, body: &B) -> Outcome<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let label = self.label("insert");
        let request =
            self.build(Method::POST).header("Prefer", RETURN_REPRESENTATION).json(body);
        self.client.call(request, &label).await
    }

    /// Applies `patch` to every row matching the filters.
    pub async fn update<B, T>(self, patch: &B) -> Outcome<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let label = self.label("update");
        let request =
            self.build(Method::PATCH).header("Prefer", RETURN_REPRESENTATION).json(patch);
        self.client.call(request, &label).await
    }

    pub async fn delete(self) -> Outcome<()> {
        let label = self.label("delete");
        let request = self.build(Method::DELETE);
        self.client.call::<serde_json::Value>(request, &label).await.map(drop)
    }

    fn filter(mut self, column: &str, expression: String) -> Self {
        self.filters.push((column.to_owned(), expression));
        self
    }

    fn label(&self, operation: &str) -> String {
        self.context.clone().unwrap_or_else(|| format!("{operation} {}", self.table))
    }

    fn build(&self, method: Method) -> RequestBuilder {
        let mut params: Vec<(String, String)> = Vec::new();
        if let Some(columns) = &self.columns {
            params.push(("select".to_owned(), columns.clone()));
        }
        params.extend(self.filters.iter().cloned());
        if !self.order.is_empty() {
            params.push(("order".to_owned(), self.order.join(",")));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_owned(), limit.to_string()));
        }

        let mut request =
            self.client.request(method, &format!("rest/v1/{}", self.table)).query(&params);
        if self.single {
            request = request.header(ACCEPT, HeaderValue::from_static(SINGLE_OBJECT));
        }
        request
    }

    #[cfg(test)]
    fn params(&self) -> Vec<(String, String)> {
        let mut params = self.filters.clone();
        if !self.order.is_empty() {
            params.push(("order".to_owned(), self.order.join(",")));
        }
        params
    }
}
