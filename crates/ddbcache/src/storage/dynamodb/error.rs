//! DynamoDB error mapping.
//!
//! Maps AWS SDK errors to `BackendError`. A failed condition expression keeps
//! its own variant so the store can report it as a boolean outcome.

use std::fmt::Debug;

use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::batch_get_item::BatchGetItemError;
use aws_sdk_dynamodb::operation::batch_write_item::BatchWriteItemError;
use aws_sdk_dynamodb::operation::delete_item::DeleteItemError;
use aws_sdk_dynamodb::operation::get_item::GetItemError;
use aws_sdk_dynamodb::operation::put_item::PutItemError;
use aws_sdk_dynamodb::operation::update_item::UpdateItemError;

use crate::storage::BackendError;

fn service(message: &str) -> BackendError {
    BackendError::Service(message.to_string())
}

/// Map a GetItem SDK error to BackendError.
pub fn map_get_item_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<GetItemError, R>,
) -> BackendError {
    match err.into_service_error() {
        GetItemError::ResourceNotFoundException(_) => service("Table not found"),
        GetItemError::ProvisionedThroughputExceededException(_) => {
            service("Throughput exceeded, please retry")
        }
        GetItemError::RequestLimitExceeded(_) => service("Request limit exceeded, please retry"),
        GetItemError::InternalServerError(_) => service("DynamoDB internal server error"),
        err => BackendError::Service(format!("GetItem failed: {:?}", err)),
    }
}

/// Map a BatchGetItem SDK error to BackendError.
pub fn map_batch_get_item_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<BatchGetItemError, R>,
) -> BackendError {
    match err.into_service_error() {
        BatchGetItemError::ResourceNotFoundException(_) => service("Table not found"),
        BatchGetItemError::ProvisionedThroughputExceededException(_) => {
            service("Throughput exceeded, please retry")
        }
        BatchGetItemError::RequestLimitExceeded(_) => {
            service("Request limit exceeded, please retry")
        }
        BatchGetItemError::InternalServerError(_) => service("DynamoDB internal server error"),
        err => BackendError::Service(format!("BatchGetItem failed: {:?}", err)),
    }
}

/// Map a PutItem SDK error to BackendError.
pub fn map_put_item_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<PutItemError, R>,
) -> BackendError {
    match err.into_service_error() {
        PutItemError::ConditionalCheckFailedException(_) => BackendError::ConditionalCheckFailed,
        PutItemError::ResourceNotFoundException(_) => service("Table not found"),
        PutItemError::ProvisionedThroughputExceededException(_) => {
            service("Throughput exceeded, please retry")
        }
        PutItemError::RequestLimitExceeded(_) => service("Request limit exceeded, please retry"),
        PutItemError::ItemCollectionSizeLimitExceededException(_) => {
            service("Item collection size limit exceeded")
        }
        PutItemError::TransactionConflictException(_) => {
            service("Transaction conflict, please retry")
        }
        PutItemError::InternalServerError(_) => service("DynamoDB internal server error"),
        err => BackendError::Service(format!("PutItem failed: {:?}", err)),
    }
}

/// Map a BatchWriteItem SDK error to BackendError.
pub fn map_batch_write_item_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<BatchWriteItemError, R>,
) -> BackendError {
    match err.into_service_error() {
        BatchWriteItemError::ResourceNotFoundException(_) => service("Table not found"),
        BatchWriteItemError::ProvisionedThroughputExceededException(_) => {
            service("Throughput exceeded, please retry")
        }
        BatchWriteItemError::RequestLimitExceeded(_) => {
            service("Request limit exceeded, please retry")
        }
        BatchWriteItemError::ItemCollectionSizeLimitExceededException(_) => {
            service("Item collection size limit exceeded")
        }
        BatchWriteItemError::InternalServerError(_) => service("DynamoDB internal server error"),
        err => BackendError::Service(format!("BatchWriteItem failed: {:?}", err)),
    }
}

/// Map an UpdateItem SDK error to BackendError.
pub fn map_update_item_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<UpdateItemError, R>,
) -> BackendError {
    match err.into_service_error() {
        UpdateItemError::ConditionalCheckFailedException(_) => {
            BackendError::ConditionalCheckFailed
        }
        UpdateItemError::ResourceNotFoundException(_) => service("Table not found"),
        UpdateItemError::ProvisionedThroughputExceededException(_) => {
            service("Throughput exceeded, please retry")
        }
        UpdateItemError::RequestLimitExceeded(_) => {
            service("Request limit exceeded, please retry")
        }
        UpdateItemError::ItemCollectionSizeLimitExceededException(_) => {
            service("Item collection size limit exceeded")
        }
        UpdateItemError::TransactionConflictException(_) => {
            service("Transaction conflict, please retry")
        }
        UpdateItemError::InternalServerError(_) => service("DynamoDB internal server error"),
        err => BackendError::Service(format!("UpdateItem failed: {:?}", err)),
    }
}

/// Map a DeleteItem SDK error to BackendError.
pub fn map_delete_item_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<DeleteItemError, R>,
) -> BackendError {
    match err.into_service_error() {
        DeleteItemError::ConditionalCheckFailedException(_) => {
            BackendError::ConditionalCheckFailed
        }
        DeleteItemError::ResourceNotFoundException(_) => service("Table not found"),
        DeleteItemError::ProvisionedThroughputExceededException(_) => {
            service("Throughput exceeded, please retry")
        }
        DeleteItemError::RequestLimitExceeded(_) => {
            service("Request limit exceeded, please retry")
        }
        DeleteItemError::ItemCollectionSizeLimitExceededException(_) => {
            service("Item collection size limit exceeded")
        }
        DeleteItemError::TransactionConflictException(_) => {
            service("Transaction conflict, please retry")
        }
        DeleteItemError::InternalServerError(_) => service("DynamoDB internal server error"),
        err => BackendError::Service(format!("DeleteItem failed: {:?}", err)),
    }
}

/// Map a request that could not be built locally to BackendError.
pub fn map_build_error(err: impl std::fmt::Display) -> BackendError {
    BackendError::Service(format!("Invalid request: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_dynamodb::types::error::ConditionalCheckFailedException;

    #[test]
    fn test_conditional_check_failed_is_distinguished() {
        let err: SdkError<PutItemError, ()> = SdkError::service_error(
            PutItemError::ConditionalCheckFailedException(
                ConditionalCheckFailedException::builder().build(),
            ),
            (),
        );

        assert_eq!(map_put_item_error(err), BackendError::ConditionalCheckFailed);
    }

    #[test]
    fn test_update_conditional_check_failed_is_distinguished() {
        let err: SdkError<UpdateItemError, ()> = SdkError::service_error(
            UpdateItemError::ConditionalCheckFailedException(
                ConditionalCheckFailedException::builder().build(),
            ),
            (),
        );

        assert_eq!(
            map_update_item_error(err),
            BackendError::ConditionalCheckFailed
        );
    }

    #[test]
    fn test_timeout_is_service_error() {
        let err: SdkError<GetItemError, ()> = SdkError::timeout_error("deadline elapsed");

        assert!(matches!(
            map_get_item_error(err),
            BackendError::Service(message) if message.starts_with("GetItem failed")
        ));
    }
}
