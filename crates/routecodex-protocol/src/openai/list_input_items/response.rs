use crate::openai::list_response_items::types::ResponseItemList;

pub type ListInputItemsResponse = ResponseItemList;
