//! # WMS resources
//!
//! Every CRUD resource follows the same conventions:
//!
//! ```text
//! GET    /{resource}?skip=&limit=&<filters>   list
//! GET    /{resource}/{id}                     get
//! POST   /{resource}                          create
//! PUT    /{resource}/{id}                     update
//! DELETE /{resource}/{id}                     delete
//! ```

use std::fmt;

use clap::ValueEnum;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::api::client::{ApiClient, path_segment};
use crate::api::error::ApiError;
use crate::api::types::Customer;
use crate::core::validate::{CustomerForm, ValidationError};

pub const DEFAULT_PAGE_SIZE: u32 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Resource {
    Inventory,
    Orders,
    Returns,
    Vehicles,
    Customers,
    Workers,
}

impl Resource {
    pub fn path(self) -> &'static str {
        match self {
            Resource::Inventory => "/inventory",
            Resource::Orders => "/orders",
            Resource::Returns => "/returns",
            Resource::Vehicles => "/vehicles",
            Resource::Customers => "/customers",
            Resource::Workers => "/workers",
        }
    }
}

/// Pagination plus free-form filters for a list call.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub skip: u32,
    pub limit: u32,
    pub filters: Vec<(String, String)>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_PAGE_SIZE,
            filters: Vec::new(),
        }
    }
}

impl ListQuery {
    pub fn page(skip: u32, limit: u32) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }

    pub fn filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((key.into(), value.into()));
        self
    }

    fn params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("skip".to_string(), self.skip.to_string()),
            ("limit".to_string(), self.limit.to_string()),
        ];
        params.extend(self.filters.iter().cloned());
        params
    }
}

/// A form submission that failed either locally or at the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum FormError {
    /// Client-side checks failed; nothing was sent.
    Invalid(Vec<ValidationError>),
    Api(ApiError),
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormError::Invalid(errors) => {
                let fields: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
                write!(f, "{}", fields.join("; "))
            }
            FormError::Api(e) => write!(f, "{}", e.user_message()),
        }
    }
}

impl std::error::Error for FormError {}

impl From<ApiError> for FormError {
    fn from(e: ApiError) -> Self {
        FormError::Api(e)
    }
}

fn item_path(resource: Resource, id: &str) -> Result<String, ApiError> {
    Ok(format!("{}/{}", resource.path(), path_segment(id)?))
}

pub struct WmsApi {
    client: ApiClient,
}

impl WmsApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub async fn list<T: DeserializeOwned>(&self, resource: Resource, query: &ListQuery) -> Result<Vec<T>, ApiError> {
        self.client.get(resource.path(), &query.params()).await
    }

    pub async fn get<T: DeserializeOwned>(&self, resource: Resource, id: &str) -> Result<T, ApiError> {
        self.client.get(&item_path(resource, id)?, &[]).await
    }

    pub async fn create<B: Serialize, T: DeserializeOwned>(&self, resource: Resource, body: &B) -> Result<T, ApiError> {
        self.client.post(resource.path(), body).await
    }

    pub async fn update<B: Serialize, T: DeserializeOwned>(
        &self,
        resource: Resource,
        id: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.client.put(&item_path(resource, id)?, body).await
    }

    pub async fn delete(&self, resource: Resource, id: &str) -> Result<(), ApiError> {
        self.client.delete(&item_path(resource, id)?).await
    }

    /// Validates `form`, then creates the customer.
    pub async fn create_customer(&self, form: &CustomerForm) -> Result<Customer, FormError> {
        form.validate().map_err(FormError::Invalid)?;
        Ok(self.create(Resource::Customers, form).await?)
    }

    /// Validates `form`, then replaces customer `id`.
    pub async fn update_customer(&self, id: &str, form: &CustomerForm) -> Result<Customer, FormError> {
        form.validate().map_err(FormError::Invalid)?;
        Ok(self.update(Resource::Customers, id, form).await?)
    }
}
