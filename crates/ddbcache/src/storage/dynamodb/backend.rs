//! DynamoDB implementation of `ItemBackend`.

use async_trait::async_trait;
use aws_sdk_dynamodb::types::{KeysAndAttributes, PutRequest, ReturnValue, WriteRequest};
use aws_sdk_dynamodb::Client;

use crate::config::Config;
use crate::storage::{
    AttributeNames, BackendError, BackendResult, BatchGetOutput, ItemBackend, StoredItem,
    WriteCondition,
};

use super::client::create_client;
use super::conversions::{
    attributes_to_item, condition_expression, conditional_increment, item_to_attributes,
    key_attributes, key_from_attributes,
};
use super::error::{
    map_batch_get_item_error, map_batch_write_item_error, map_build_error,
    map_delete_item_error, map_get_item_error, map_put_item_error, map_update_item_error,
};

/// Item backend talking to one DynamoDB table.
#[derive(Debug, Clone)]
pub struct DynamoDbBackend {
    client: Client,
    table_name: String,
    attributes: AttributeNames,
    consistent_read: bool,
}

impl DynamoDbBackend {
    /// Creates a backend with the default attribute names and eventually
    /// consistent reads.
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
            attributes: AttributeNames::default(),
            consistent_read: false,
        }
    }

    /// Creates a backend, and its client, from configuration.
    pub async fn from_config(config: &Config) -> Self {
        let client = create_client(config).await;

        Self::new(client, config.table_name.clone())
            .with_attribute_names(config.attribute_names())
            .with_consistent_read(config.consistent_read)
    }

    /// Use custom attribute names for key, value and expiration.
    pub fn with_attribute_names(mut self, attributes: AttributeNames) -> Self {
        self.attributes = attributes;
        self
    }

    /// Use strongly consistent point and batch reads.
    pub fn with_consistent_read(mut self, consistent_read: bool) -> Self {
        self.consistent_read = consistent_read;
        self
    }

    /// Get the table name.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

#[async_trait]
impl ItemBackend for DynamoDbBackend {
    async fn get_item(&self, key: &str) -> BackendResult<Option<StoredItem>> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(key_attributes(key, &self.attributes)))
            .consistent_read(self.consistent_read)
            .send()
            .await
            .map_err(map_get_item_error)?;

        match result.item {
            Some(item) => Ok(Some(attributes_to_item(&item, &self.attributes)?)),
            None => Ok(None),
        }
    }

    async fn batch_get_items(&self, keys: &[String]) -> BackendResult<BatchGetOutput> {
        if keys.is_empty() {
            return Ok(BatchGetOutput::default());
        }

        let request = KeysAndAttributes::builder()
            .set_keys(Some(
                keys.iter()
                    .map(|key| key_attributes(key, &self.attributes))
                    .collect(),
            ))
            .consistent_read(self.consistent_read)
            .build()
            .map_err(map_build_error)?;

        let result = self
            .client
            .batch_get_item()
            .request_items(&self.table_name, request)
            .send()
            .await
            .map_err(map_batch_get_item_error)?;

        let items = result
            .responses
            .and_then(|mut responses| responses.remove(&self.table_name))
            .unwrap_or_default()
            .iter()
            .map(|item| attributes_to_item(item, &self.attributes))
            .collect::<BackendResult<Vec<_>>>()?;

        let unprocessed = result
            .unprocessed_keys
            .and_then(|mut unprocessed| unprocessed.remove(&self.table_name))
            .map(|request| {
                request
                    .keys()
                    .iter()
                    .filter_map(|key| key_from_attributes(key, &self.attributes))
                    .collect()
            })
            .unwrap_or_default();

        Ok(BatchGetOutput { items, unprocessed })
    }

    async fn put_item(
        &self,
        item: StoredItem,
        condition: Option<WriteCondition>,
    ) -> BackendResult<()> {
        let mut request = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item_to_attributes(&item, &self.attributes)));

        if let Some(condition) = condition {
            let expression = condition_expression(&condition, &self.attributes);
            request = request
                .set_expression_attribute_values(expression.values_if_any())
                .set_expression_attribute_names(Some(expression.names))
                .condition_expression(expression.expression);
        }

        request.send().await.map_err(map_put_item_error)?;

        Ok(())
    }

    async fn batch_put_items(&self, items: Vec<StoredItem>) -> BackendResult<Vec<String>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let requests = items
            .iter()
            .map(|item| {
                PutRequest::builder()
                    .set_item(Some(item_to_attributes(item, &self.attributes)))
                    .build()
                    .map(|put| WriteRequest::builder().put_request(put).build())
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_build_error)?;

        let result = self
            .client
            .batch_write_item()
            .request_items(&self.table_name, requests)
            .send()
            .await
            .map_err(map_batch_write_item_error)?;

        let unprocessed = result
            .unprocessed_items
            .and_then(|mut unprocessed| unprocessed.remove(&self.table_name))
            .unwrap_or_default()
            .iter()
            .filter_map(|request| request.put_request())
            .filter_map(|put| key_from_attributes(put.item(), &self.attributes))
            .collect();

        Ok(unprocessed)
    }

    async fn add_to_value(
        &self,
        key: &str,
        delta: i64,
        condition: WriteCondition,
    ) -> BackendResult<String> {
        let update = conditional_increment(delta, &condition, &self.attributes);

        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .set_key(Some(key_attributes(key, &self.attributes)))
            .update_expression(update.update_expression)
            .condition_expression(update.condition_expression)
            .set_expression_attribute_names(Some(update.names))
            .set_expression_attribute_values(Some(update.values))
            .return_values(ReturnValue::UpdatedNew)
            .send()
            .await
            .map_err(map_update_item_error)?;

        result
            .attributes
            .as_ref()
            .and_then(|attributes| attributes.get(&self.attributes.value))
            .and_then(|value| value.as_n().ok())
            .cloned()
            .ok_or_else(|| {
                BackendError::InvalidItem(format!(
                    "UpdateItem returned no numeric {}",
                    self.attributes.value
                ))
            })
    }

    async fn delete_item(
        &self,
        key: &str,
        condition: Option<WriteCondition>,
    ) -> BackendResult<()> {
        let mut request = self
            .client
            .delete_item()
            .table_name(&self.table_name)
            .set_key(Some(key_attributes(key, &self.attributes)));

        if let Some(condition) = condition {
            let expression = condition_expression(&condition, &self.attributes);
            request = request
                .set_expression_attribute_values(expression.values_if_any())
                .set_expression_attribute_names(Some(expression.names))
                .condition_expression(expression.expression);
        }

        request.send().await.map_err(map_delete_item_error)?;

        Ok(())
    }
}
