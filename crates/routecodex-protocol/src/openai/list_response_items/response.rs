use super::types::ResponseItemList;

pub type ListResponseItemsResponse = ResponseItemList;
