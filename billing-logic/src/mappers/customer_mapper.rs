use billing_core::Customer;
use billing_db::CustomerModel;

pub struct CustomerMapper;

impl CustomerMapper {
    pub fn to_model(customer: Customer) -> CustomerModel {
        CustomerModel {
            customer_id: customer.customer_id,
            name: customer.name,
            address: customer.address,
            is_delinquent: customer.is_delinquent,
            active: customer.active,
            loan_id: customer.loan_id,
            create_date: customer.create_date,
            updated_at: customer.updated_at,
        }
    }

    pub fn from_model(model: CustomerModel) -> Customer {
        Customer {
            customer_id: model.customer_id,
            name: model.name,
            address: model.address,
            is_delinquent: model.is_delinquent,
            active: model.active,
            loan_id: model.loan_id,
            create_date: model.create_date,
            updated_at: model.updated_at,
        }
    }
}
