//! GraphQL documents for Projects v2 board access.

pub(super) const ADD_PROJECT_ITEM: &str = "\
mutation($project: ID!, $content: ID!) {
  addProjectV2ItemById(input: {projectId: $project, contentId: $content}) {
    item { id }
  }
}";

pub(super) const STATUS_FIELD: &str = "\
query($project: ID!, $name: String!) {
  node(id: $project) {
    ... on ProjectV2 {
      field(name: $name) {
        ... on ProjectV2SingleSelectField { id name options { id name } }
      }
    }
  }
}";

pub(super) const UPDATE_STATUS: &str = "\
mutation($project: ID!, $item: ID!, $field: ID!, $option: String!) {
  updateProjectV2ItemFieldValue(input: {
    projectId: $project, itemId: $item, fieldId: $field,
    value: {singleSelectOptionId: $option}
  }) {
    projectV2Item { id }
  }
}";

pub(super) const ITEM_STATUS: &str = "\
query($item: ID!, $name: String!) {
  node(id: $item) {
    ... on ProjectV2Item {
      fieldValueByName(name: $name) {
        ... on ProjectV2ItemFieldSingleSelectValue { name }
      }
    }
  }
}";
